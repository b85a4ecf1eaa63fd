//! Remote services the sagas call.

pub mod diagram;
pub mod http_diagram;

pub use diagram::{
    CreatedDiagram, DiagramError, DiagramRecord, DiagramService, InMemoryDiagramService,
    RemoteOutcome,
};
pub use http_diagram::HttpDiagramClient;
