pub mod bus;
pub mod commands;
pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod export;
pub mod filter;
pub mod grouping;
pub mod layout;
pub mod model;
pub mod palette;
pub mod popover;
pub mod ring;
pub mod surface;
pub mod svg;
pub mod views;

pub use bus::{Initiator, SelectionBus, SelectionState, Upward, ViewEvent};
pub use commands::{BarplotCommands, GraphCommands, TableCommands};
pub use coordinator::{
    CoordinatorSettings, GraphCounts, GraphLayoutCoordinator,
    PopoverRequest,
};
pub use error::{Panel, SyncError};
pub use filter::{
    ConfidenceControl, FetchTicket, FilterPipeline, FilterState,
    Resolution,
};
pub use grouping::{ClusterGrouping, EdgePartition};
pub use model::{
    Edge, GeneRecord, GraphPayload, Node, NodeDetail, NodeId, Pathway,
};
pub use palette::{Color, NodeAttribute, Palette, Palettes};
pub use ring::{RingKey, RingSlice, RingSpec};
pub use surface::{GraphSurface, SurfaceFactory};
