use std::collections::HashMap;

use serde::Serialize;

use crate::models::outcome::FailureKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureCount {
    pub kind: FailureKind,
    pub message: String,
    pub count: u32,
}

#[derive(Default)]
pub struct FailureStats {
    // {(错误类型, 错误信息): 次数}
    errors: HashMap<(FailureKind, String), u32>,
}

impl FailureStats {
    pub fn new() -> Self {
        FailureStats {
            errors: HashMap::new(),
        }
    }

    // 增加一个错误和对应的出现次数
    pub fn increment(&mut self, kind: FailureKind, error_message: &str) {
        *self
            .errors
            .entry((kind, error_message.to_string()))
            .or_insert(0) += 1;
    }

    /// Most frequent first; ties broken by kind then message so output is stable.
    pub fn into_sorted(self) -> Vec<FailureCount> {
        let mut counts: Vec<FailureCount> = self
            .errors
            .into_iter()
            .map(|((kind, message), count)| FailureCount {
                kind,
                message,
                count,
            })
            .collect();
        counts.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.kind.cmp(&b.kind))
                .then_with(|| a.message.cmp(&b.message))
        });
        counts
    }
}
