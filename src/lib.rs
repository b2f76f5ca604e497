//! Tress
//!
//! Tress is the checkout discount engine for a hair & wig storefront: it prorates competing
//! discount proposals over cart lines, keeps clearance variants out of promotions, and builds
//! the collection/tag based percentage discounts that feed those proposals.

pub mod allocator;
pub mod cart;
pub mod discounts;
pub mod exclusion;
pub mod fixtures;
pub mod functions;
pub mod prelude;
pub mod pricing;
pub mod report;
