//! 호스트 플랜 모듈
//!
//! push-down 드라이버가 순회하는 LogicalPlan과 표현식 타입.

pub mod types;

// Re-export main types
pub use types::*;
