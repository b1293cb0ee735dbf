//! Shared data model for the presentation flow: wallet documents, the
//! verifier's parsed request, and the holder's selective-disclosure response.

pub mod document;
pub mod request;
pub mod response;
