pub mod dispatcher;
pub mod line_server;
pub mod protocol;

pub use dispatcher::{channel, Dispatcher, DispatcherHandle, Envelope, GameSummary};
pub use line_server::serve_lines;
pub use protocol::{BoardInput, Request, Response, Strategy};
