mod geometry;
mod script;
mod settings;
mod shutdown;
mod split;
mod validate;

pub mod prelude {
    pub use crate::geometry::{
        intersect, intersection, line_through_points, phase_length, phase_width, script_length,
        script_width, Line, ParallelLinesError, Point,
    };
    pub use crate::script::{Phase, PhaseShape, Script, ScriptConfig};
    pub use crate::settings::{
        SplitSettings, DEFAULT_MAX_CHUNK_DURATION_S, DEFAULT_MAX_CHUNK_RPS,
        DEFAULT_MAX_SCRIPT_DURATION_S, DEFAULT_MAX_SCRIPT_RPS, DEFAULT_TIME_BUFFER_MS,
    };
    pub use crate::shutdown::{ShutdownError, ShutdownHandle, ShutdownListener};
    pub use crate::split::phase::{
        split_phase_by_length, split_phase_by_width, DegenerateCrossingError, PhaseBands,
        PhaseHalves,
    };
    pub use crate::split::script::{split_script_by_length, split_script_by_width, ScriptHalves};
    pub use crate::validate::validate;
}
