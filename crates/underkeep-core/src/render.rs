//! Renderer collaborator seam.
//!
//! The simulation core never talks to a GPU; it hands the renderer a
//! per-creature instance record after each tick. The draw pass is
//! read-only with respect to simulation state.

use serde::{Deserialize, Serialize};

use crate::components::Vec3;

/// Handle to a renderable owned by the renderer backend.
pub type RenderableId = u32;

/// Handle to a sprite descriptor in the asset system.
pub type SpriteId = u32;

/// Per-instance constant buffer record for GPU instancing.
/// Fixed 8-field, 32-byte layout; do not reorder.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CreatureInstanceData {
    pub anim_index: f32,
    pub num_anim_frames: f32,
    pub sprite_width: f32,
    pub is_frozen: u32,
    pub is_flipped: u32,
    pub is_hovered: u32,
    pub pad: [u32; 2],
}

const _: () = assert!(std::mem::size_of::<CreatureInstanceData>() == 32);

/// World transform handed to the renderer alongside the instance data.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DrawTransform {
    /// Position in subtile units.
    pub position: Vec3,
    pub facing: Vec3,
}

/// Failure to allocate renderer-side resources. This is the one fatal
/// error class the simulation propagates to the surrounding engine.
#[derive(Debug)]
pub enum RenderError {
    AllocationFailed,
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::AllocationFailed => write!(f, "renderable allocation failed"),
        }
    }
}

impl std::error::Error for RenderError {}

/// The rendering backend, as the simulation sees it.
pub trait Renderer {
    /// Allocate a renderable (and its per-instance buffer) for a sprite.
    fn create_renderable(&mut self, sprite: SpriteId) -> Result<RenderableId, RenderError>;

    /// Emit one draw call. Called only after a tick completes.
    fn draw(
        &mut self,
        renderable: RenderableId,
        transform: DrawTransform,
        instance: &CreatureInstanceData,
    );

    /// Release a renderable and any GPU-side buffer it owns.
    fn destroy_renderable(&mut self, renderable: RenderableId);
}

/// Owning reference to renderer-side resources, attached per creature.
/// Released when the creature is despawned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderHandle {
    pub renderable: RenderableId,
    pub sprite: SpriteId,
    pub visible: bool,
}

/// Test/headless renderer that records every call.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    next_id: RenderableId,
    pub live: Vec<RenderableId>,
    pub draws: Vec<(RenderableId, DrawTransform, CreatureInstanceData)>,
    /// When set, `create_renderable` fails, for exercising the fatal
    /// resource-exhaustion path.
    pub fail_allocations: bool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for RecordingRenderer {
    fn create_renderable(&mut self, _sprite: SpriteId) -> Result<RenderableId, RenderError> {
        if self.fail_allocations {
            return Err(RenderError::AllocationFailed);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.live.push(id);
        Ok(id)
    }

    fn draw(
        &mut self,
        renderable: RenderableId,
        transform: DrawTransform,
        instance: &CreatureInstanceData,
    ) {
        self.draws.push((renderable, transform, *instance));
    }

    fn destroy_renderable(&mut self, renderable: RenderableId) {
        self.live.retain(|&id| id != renderable);
    }
}
