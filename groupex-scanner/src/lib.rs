pub mod dom;
pub mod error;
pub mod identity;
pub mod membership;
pub mod names;
pub mod noise;
pub mod page;
pub mod pipeline;
pub mod record;
pub mod scroll;

pub use error::{ExportError, Result};
pub use identity::{IdentityResolver, ResolvedIdentity};
pub use membership::{AcceptAll, AncestorTextClassifier, MembershipClassifier};
pub use names::{NameResolution, NameResolver, NameStrategy};
pub use noise::NoiseStripper;
pub use page::{HtmlPage, Page, ScrollBehavior};
pub use pipeline::{ContextRule, Extraction, ExtractionPipeline};
pub use record::GroupRecord;
pub use scroll::{
    RenderPass, ScrollCadence, ScrollConfig, ScrollLoader, ScrollOutcome, ScrollProgressCallback,
    ScrollReport,
};
