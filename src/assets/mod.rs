pub mod cache;
pub mod material;
pub mod mesh;

pub use cache::AssetCache;
pub use material::{CollisionReaction, Material, MaterialLibrary};
pub use mesh::{MeshBuffer, RenderMesh};
