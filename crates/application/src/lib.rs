//! Application services and ports.

#![forbid(unsafe_code)]

mod access_service;
mod directory_ports;
mod license_service;
mod relationship_ports;

pub use access_service::{AccessService, CheckPermissionInput};
pub use directory_ports::{
    DEFAULT_SUBJECT_STREAM_BUFFER, PrincipalRepository, SubjectRepository, SubjectSink,
    SubjectStream,
};
pub use license_service::{
    LicenseService, ModifySeatsInput, SeatAssignmentQuery, SeatCounts, SeatFilter,
};
pub use relationship_ports::{RelationshipStore, normalize_seat_batch};
