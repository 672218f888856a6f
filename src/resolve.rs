//! 语句解析：把识别出的文本映射到类别
//!
//! 只做整句精确匹配（去首尾空白、转小写），不拆词、不去语气词、不做同义词。

use crate::registry::{Category, CategoryRegistry};

/// 解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found(Category),
    /// 语句不在类别表中，属于正常结果而非错误
    NotFound,
}

impl Resolution {
    pub fn category(self) -> Option<Category> {
        match self {
            Self::Found(category) => Some(category),
            Self::NotFound => None,
        }
    }
}

/// 规范化语句：去掉首尾空白并转为小写
pub fn normalize(utterance: &str) -> String {
    utterance.trim().to_lowercase()
}

/// 把语句解析为类别
pub fn resolve(registry: &CategoryRegistry, utterance: &str) -> Resolution {
    match registry.lookup(&normalize(utterance)) {
        Some(category) => Resolution::Found(category),
        None => Resolution::NotFound,
    }
}
