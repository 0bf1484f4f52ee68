/// Exploration rate after `steps` self-play moves:
/// `min + (max - min) * exp(-speed * steps)`.
pub fn decay_epsilon(min_epsilon: f64, max_epsilon: f64, decay_speed: f64, steps: u64) -> f64 {
    min_epsilon + (max_epsilon - min_epsilon) * (-decay_speed * steps as f64).exp()
}
