//! Candidate ordering and suppression.
//!
//! Candidates are sorted by descending confidence, then greedily filtered by
//! IoU against the boxes already kept.

pub mod nms;
pub mod sort;
