//! Opportunity domain entities.

pub mod attachment;
pub mod model;
pub mod opp_type;
pub mod status;

pub use attachment::{sanitize_ref_no, OpportunityFile};
pub use model::{NewOpportunity, Opportunity, StatusChange, SubmitProposal, UpdateOpportunity};
pub use opp_type::OppType;
pub use status::OpportunityStatus;
