pub mod adaptors;
pub mod attachments;
pub mod blobs;
pub mod compress;
pub mod dashboard;
pub mod purge;
