// Static reference data: grade points, major preparation descriptions,
// and the 11 general-education areas. Nothing here touches the network.

pub mod general_ed;
pub mod grades;
pub mod handlers;
pub mod majors;

pub use general_ed::{AreaId, GeneralEdDefinition, GENERAL_ED_AREAS};
pub use grades::Grade;
pub use majors::{lookup_major, MajorRequirements, DEFAULT_MAJOR, MAJORS};

/// Articulation reference returned in every result's `sources` map.
pub const ASSIST_ORG_URL: &str = "https://assist.org";

/// Target used when neither the request nor the session profile names one.
pub const DEFAULT_INSTITUTION: &str = "UC Santa Cruz";
