pub mod mapper;
pub mod scoring;
pub mod spans;
pub mod star;
pub mod tokenization;
pub mod viterbi;

pub use mapper::SegmentMapper;
pub use star::StarEncoding;
pub use tokenization::Dictionary;
pub use viterbi::FrameAlignment;
