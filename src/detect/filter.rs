use crate::detect::bounds::Detection;
use crate::registry::CategoryId;

/// 按类别筛选后的检测结果
///
/// 借用自原始的 `DetectionSet`，生命周期与其绑定；保持原有相对顺序。
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredDetections<'a> {
    target: CategoryId,
    detections: Vec<&'a Detection>,
}

impl<'a> FilteredDetections<'a> {
    pub fn target(&self) -> CategoryId {
        self.target
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Detection> + '_ {
        self.detections.iter().copied()
    }
}

impl<'a, 'b> IntoIterator for &'b FilteredDetections<'a> {
    type Item = &'a Detection;
    type IntoIter = std::iter::Copied<std::slice::Iter<'b, &'a Detection>>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter().copied()
    }
}

/// 保留 `class_id == target` 的检测结果
///
/// 稳定筛选：不重排、不去重、不做 NMS。可以作用于 `&DetectionSet`，
/// 也可以作用于已筛选过的 `&FilteredDetections`。
pub fn filter<'a, I>(detections: I, target: CategoryId) -> FilteredDetections<'a>
where
    I: IntoIterator<Item = &'a Detection>,
{
    FilteredDetections {
        target,
        detections: detections
            .into_iter()
            .filter(|detection| detection.class_id == target)
            .collect(),
    }
}
