//! Serverless-style audio analysis worker.
//!
//! A job names a stored audio object. The worker downloads it, extracts
//! tempo, beats, MFCC, chroma and spectral descriptors, renders them into a
//! text summary, embeds that summary and posts everything to a callback.

pub mod api;
pub mod audio;
pub mod callback;
pub mod config;
pub mod embedding;
pub mod error;
pub mod pipeline;
pub mod storage;
pub mod summary;
pub mod worker;

pub use crate::api::{build_router, AppState};
pub use crate::error::{WorkerError, WorkerResult};
pub use crate::pipeline::{AnalysisResult, Analyzer, ErrorCode, ProcessingStatus};
pub use crate::worker::{JobRequest, JobResponse, Worker};
