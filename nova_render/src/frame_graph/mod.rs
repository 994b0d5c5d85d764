/// Frame graph module - attachment sets, render passes and the fixed
/// deferred pipeline that ties them together

pub mod attachment_set;
pub mod render_pass;
pub mod pass_action;
pub mod draw_list;
pub mod frame_graph;

pub use attachment_set::{Attachment, AttachmentSet, AttachmentSetDesc, AttachmentSpec};
pub use render_pass::{PassState, RenderPass};
pub use pass_action::{
    CustomAction, DrawListAction, FrameInputs, FullscreenAction, OverlayAction, OverlayStream,
    PassAction, PassContext,
};
pub use draw_list::{build_draw_list, project_overlays, FLAT_NORMAL};
pub use frame_graph::{validate_dependencies, FrameGraph, NodeIo, PassId, FRAME_REGION};
