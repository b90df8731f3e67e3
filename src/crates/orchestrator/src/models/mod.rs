//! Request, response and stage result types

pub mod interests;
pub mod request;
pub mod response;

pub use interests::{BlockList, InterestFromUsageRequest, InterestFromUsageResponse, InterestTopic};
pub use request::{AnalysisRequest, Layer, LexicalImageRequest, LexicalMapRequest, MistakesRequest};
pub use response::{
    CommonMistake, Layer1Response, Layer2Response, Layer3Response, Layer4Response,
    LexicalImageResponse, LiveContext, PronunciationResponse, RelatedWord, RelatedWordCandidate,
};
