use image::DynamicImage;
use serde::Deserialize;

use crate::detect::bounds::DetectionSet;
use crate::detect::detector::Inference;
use crate::Result;

/// 检测结果复用策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPolicy {
    /// 首次推理后缓存结果，后续语句直接复用（图像在进程内不变）
    #[default]
    Cached,
    /// 每条语句都重新推理
    PerUtterance,
}

/// 在推理接口之上按策略提供检测结果
///
/// 缓存只写一次；没有图像更换路径，所以不需要失效逻辑。
pub struct DetectionProvider {
    inference: Box<dyn Inference>,
    policy: DetectionPolicy,
    cached: Option<DetectionSet>,
    inference_runs: usize,
}

impl DetectionProvider {
    pub fn new(inference: Box<dyn Inference>, policy: DetectionPolicy) -> Self {
        Self {
            inference,
            policy,
            cached: None,
            inference_runs: 0,
        }
    }

    pub fn policy(&self) -> DetectionPolicy {
        self.policy
    }

    /// 已执行的推理次数
    pub fn inference_runs(&self) -> usize {
        self.inference_runs
    }

    /// 取得图像的检测结果
    ///
    /// # Errors
    ///
    /// 推理失败时返回错误，缓存保持为空，下一轮会重试
    pub fn detections(&mut self, image: &DynamicImage) -> Result<&DetectionSet> {
        let stale = match self.policy {
            DetectionPolicy::Cached => self.cached.is_none(),
            DetectionPolicy::PerUtterance => true,
        };

        if stale {
            let detections = self.inference.infer(image)?;
            self.inference_runs += 1;
            tracing::debug!(
                policy = ?self.policy,
                runs = self.inference_runs,
                count = detections.len(),
                "detection set refreshed"
            );
            self.cached = Some(detections);
        }

        Ok(self.cached.get_or_insert_with(DetectionSet::new))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::detect::bounds::{BoundingBox, Detection};
    use crate::registry::CategoryId;
    use crate::Error;

    struct CountingInference {
        calls: Rc<Cell<usize>>,
        fail_first: bool,
    }

    impl Inference for CountingInference {
        fn infer(&mut self, _image: &DynamicImage) -> Result<DetectionSet> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if self.fail_first && call == 1 {
                return Err(Error::Output("boom".to_string()));
            }
            Ok(vec![Detection::new(
                CategoryId(call),
                BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                0.9,
            )]
            .into())
        }
    }

    fn provider(policy: DetectionPolicy, fail_first: bool) -> (DetectionProvider, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let inference = CountingInference {
            calls: Rc::clone(&calls),
            fail_first,
        };
        (DetectionProvider::new(Box::new(inference), policy), calls)
    }

    #[test]
    fn cached_policy_runs_inference_once() {
        let (mut provider, calls) = provider(DetectionPolicy::Cached, false);
        assert_eq!(provider.policy(), DetectionPolicy::Cached);
        let image = DynamicImage::new_rgb8(8, 8);

        for _ in 0..5 {
            let detections = provider.detections(&image).unwrap();
            assert_eq!(detections.get(0).unwrap().class_id, CategoryId(1));
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(provider.inference_runs(), 1);
    }

    #[test]
    fn per_utterance_policy_runs_every_time() {
        let (mut provider, calls) = provider(DetectionPolicy::PerUtterance, false);
        let image = DynamicImage::new_rgb8(8, 8);

        for _ in 0..3 {
            provider.detections(&image).unwrap();
        }
        assert_eq!(calls.get(), 3);
        assert_eq!(
            provider.detections(&image).unwrap().get(0).unwrap().class_id,
            CategoryId(4)
        );
    }

    #[test]
    fn failed_inference_is_retried() {
        let (mut provider, calls) = provider(DetectionPolicy::Cached, true);
        let image = DynamicImage::new_rgb8(8, 8);

        assert!(provider.detections(&image).is_err());
        assert!(provider.detections(&image).is_ok());
        assert!(provider.detections(&image).is_ok());
        assert_eq!(calls.get(), 2);
    }
}
