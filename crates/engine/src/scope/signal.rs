//! 신호 버스 -- 성공/실패 플래그를 열린 스코프로 전달
//!
//! 버스는 문서 하나의 처리 실행에만 존재합니다. 전역 플래그는 없습니다.
//!
//! - `auto` 플래그는 가장 안쪽의 열린 스코프 자신에게만 적용됩니다.
//! - 이름 있는 플래그는 안쪽에서 바깥쪽으로 올라가며, 그 이름을 End 패턴에
//!   선언한(= 듣는) 가장 가까운 스코프가 받습니다. 아무도 듣지 않으면 버려지고 집계됩니다.

use crate::rule::FlagSet;

use super::instance::ScopeInstance;

/// 문서 처리 실행 하나에 국한된 플래그 버스
#[derive(Debug, Default)]
pub struct SignalBus {
    delivered: u64,
    unclaimed: u64,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 플래그를 열린 스코프 스택에 전달합니다.
    ///
    /// `stack`은 바깥(루트)에서 안쪽 순서입니다.
    pub fn dispatch(&mut self, flags: &FlagSet, stack: &mut [ScopeInstance<'_>]) {
        if flags.is_empty() {
            return;
        }

        for polarity in flags.auto() {
            if let Some(innermost) = stack.last_mut() {
                innermost.raise(polarity);
            }
        }

        for (name, polarity) in flags.named() {
            match stack
                .iter_mut()
                .rev()
                .find(|scope| scope.definition().listens_for(name))
            {
                Some(listener) => {
                    tracing::trace!(
                        flag = name,
                        ?polarity,
                        scope = %listener.name(),
                        "flag delivered"
                    );
                    listener.raise(polarity);
                    self.delivered += 1;
                }
                None => {
                    tracing::trace!(flag = name, ?polarity, "no open scope listens for flag");
                    self.unclaimed += 1;
                }
            }
        }
    }

    /// 받는 스코프가 있었던 이름 있는 플래그 수
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// 버려진 이름 있는 플래그 수
    pub fn unclaimed(&self) -> u64 {
        self.unclaimed
    }
}
