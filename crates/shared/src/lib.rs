// geodata-tools - shared library
// Pieces used by more than one workspace binary.

pub mod log;
