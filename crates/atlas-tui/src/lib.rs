pub mod app;
pub mod error;
pub mod event;
pub mod model;
pub mod render;
pub mod runner;
pub mod snapshot;
pub mod spinner;
mod style;
pub mod ui;

pub use app::*;
pub use error::*;
pub use event::*;
pub use model::*;
pub use render::*;
pub use runner::*;
pub use snapshot::*;
pub use spinner::*;
pub use ui::*;

#[cfg(test)]
mod tests {
    use super::{
        draw_watch, CommandExecutor, RefreshError, RefreshResult, RenderOptions, Snapshot, Spinner,
        SpinnerRegistry, StatusRow, TuiError, WatchApp, WatchCommand, WatchMessage,
    };
    use std::any::TypeId;

    #[test]
    fn crate_root_reexports_watch_types() {
        let _ = TypeId::of::<WatchApp>();
        let _ = TypeId::of::<WatchMessage>();
        let _ = TypeId::of::<WatchCommand>();
        let _ = TypeId::of::<CommandExecutor>();
        let _ = TypeId::of::<RenderOptions>();
        let _ = TypeId::of::<Snapshot>();
        let _ = TypeId::of::<StatusRow>();
        let _ = TypeId::of::<RefreshResult>();
        let _ = draw_watch;
    }

    #[test]
    fn crate_root_reexports_spinner_and_errors() {
        let _ = TypeId::of::<Spinner>();
        let _ = TypeId::of::<SpinnerRegistry>();
        let _ = TypeId::of::<TuiError>();
        let _ = TypeId::of::<RefreshError>();
    }
}
