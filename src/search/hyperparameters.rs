//! Heuristic search configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchHyperparameters {
    /// Number of moves looked ahead from the current board.
    /// Default: 4
    pub max_depth: usize,

    /// Keep the tree between calls and only expand new nodes.
    /// Default: false
    pub incremental: bool,

    /// In incremental mode, fail instead of rebuilding when the live board
    /// matches no node of the kept tree.
    /// Default: false
    pub strict_tree: bool,
}

impl Default for SearchHyperparameters {
    fn default() -> Self {
        Self {
            max_depth: 4,
            incremental: false,
            strict_tree: false,
        }
    }
}

impl SearchHyperparameters {
    pub fn with_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("search depth must be at least 1".to_string());
        }
        if self.max_depth > 8 {
            return Err(format!("search depth {} is too deep (max 8)", self.max_depth));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_depth() {
        let params = SearchHyperparameters::default();
        assert_eq!(params.max_depth, 4);
        assert!(!params.incremental);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_depth_bounds() {
        assert!(SearchHyperparameters::with_depth(0).validate().is_err());
        assert!(SearchHyperparameters::with_depth(9).validate().is_err());
        assert!(SearchHyperparameters::with_depth(8).validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: SearchHyperparameters = serde_json::from_str(r#"{"max_depth": 3}"#).unwrap();
        assert_eq!(params.max_depth, 3);
        assert!(!params.strict_tree);
    }
}
