//! 스코프 처리 -- 라인 스트림에서 스코프 인스턴스 트리를 구성
//!
//! # 아키텍처
//! - [`automaton`]: 열린 스코프 스택을 관리하는 단일 패스 오토마톤
//! - [`instance`]: 열린 스코프 하나의 상태와 종료 상태 결정
//! - [`signal`]: 성공/실패 플래그 전달

pub mod automaton;
pub mod instance;
pub mod signal;

pub use automaton::{ParsedLog, ScopeAutomaton};
pub use instance::{ScopeInstance, ScopeStatus, Signals};
pub use signal::SignalBus;
