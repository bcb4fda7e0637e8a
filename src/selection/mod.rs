mod cuts;
mod policy;
mod selector;
pub use cuts::{
    color_cut, in_color_box, is_extended, is_masked, masking, passes_quality, quality_cuts,
    select, select_randoms, star_galaxy, SelectionStages,
};
pub use policy::{MinInputCount, SelectionPolicy};
pub use selector::{TargetError, TargetSelection, TargetSelector};
