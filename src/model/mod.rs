pub mod evidence;
pub mod report;
pub mod score;
pub mod subject;

pub use evidence::{
    ActionKind, CampaignPromise, Category, EvidenceRecord, Impact, LegislativeAction,
    PromiseStatus,
};
pub use report::{promise_fulfillment_rate, EvaluationMetadata, EvaluationReport};
pub use score::{BiasCheck, BiasKind, CategoryScore, PoliticianScore, Severity};
pub use subject::{Subject, TimeRange};
