//! 类别表
//!
//! 固定、有序的类别名称表，类别 ID 即其在表中的位置。进程启动时构建一次，之后只读。

use std::fmt;
use std::sync::OnceLock;

use crate::{Error, Result};

/// COCO 数据集的 80 个类别，顺序与 YOLO 模型输出的类别下标一致
pub const COCO_CLASSES: [&str; 80] = [
    "Person", "Bicycle", "Car", "Motorcycle", "Airplane", "Bus", "Train", "Truck", "Boat",
    "Traffic Light", "Fire Hydrant", "Stop Sign", "Parking Meter", "Bench", "Bird", "Cat",
    "Dog", "Horse", "Sheep", "Cow", "Elephant", "Bear", "Zebra", "Giraffe", "Backpack", "Umbrella",
    "Handbag", "Tie", "Suitcase", "Frisbee", "Skis", "Snowboard", "Sports Ball", "Kite", "Baseball Bat",
    "Baseball Glove", "Skateboard", "Surfboard", "Tennis Racket", "Bottle", "Wine Glass", "Cup", "Fork",
    "Knife", "Spoon", "Bowl", "Banana", "Apple", "Sandwich", "Orange", "Broccoli", "Carrot", "Hot Dog",
    "Pizza", "Donut", "Cake", "Chair", "Couch", "Potted Plant", "Bed", "Dining Table", "Toilet", "TV",
    "Laptop", "Mouse", "Remote", "Keyboard", "Cell Phone", "Microwave", "Oven", "Toaster", "Sink", "Refrigerator",
    "Book", "Clock", "Vase", "Scissors", "Teddy Bear", "Hair Drier", "Toothbrush",
];

/// 类别 ID（从 0 开始，等于类别在表中的位置）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(pub usize);

impl CategoryId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 一个可检测的类别
///
/// `name` 保留原始大小写用于显示，匹配时忽略大小写。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: &'static str,
}

/// 不可变的类别表
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    names: Vec<&'static str>,
    /// 预先计算好的小写名称，与 `names` 一一对应
    folded: Vec<String>,
}

impl CategoryRegistry {
    /// 用给定名称构建类别表
    ///
    /// # Errors
    ///
    /// 名称表为空，或存在忽略大小写后重复的名称时返回 `Error::Config`
    pub fn new(names: &[&'static str]) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::Config("category registry must not be empty".to_string()));
        }

        let folded: Vec<String> = names.iter().map(|name| name.to_lowercase()).collect();
        for (i, name) in folded.iter().enumerate() {
            if folded[..i].contains(name) {
                return Err(Error::Config(format!("duplicate category name: {}", names[i])));
            }
        }

        Ok(Self {
            names: names.to_vec(),
            folded,
        })
    }

    /// 内置的 COCO 类别表
    pub fn coco() -> &'static Self {
        static COCO: OnceLock<CategoryRegistry> = OnceLock::new();
        COCO.get_or_init(|| Self {
            names: COCO_CLASSES.to_vec(),
            folded: COCO_CLASSES.iter().map(|name| name.to_lowercase()).collect(),
        })
    }

    /// 忽略大小写的精确查找；找不到时返回 `None`
    pub fn lookup(&self, name: &str) -> Option<Category> {
        let name = name.to_lowercase();
        self.folded
            .iter()
            .position(|candidate| *candidate == name)
            .map(|index| Category {
                id: CategoryId(index),
                name: self.names[index],
            })
    }

    pub fn get(&self, id: CategoryId) -> Option<Category> {
        self.names.get(id.0).map(|&name| Category { id, name })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        self.names.iter().enumerate().map(|(index, &name)| Category {
            id: CategoryId(index),
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coco_table_has_eighty_classes_in_model_order() {
        let registry = CategoryRegistry::coco();
        assert_eq!(registry.len(), 80);
        assert_eq!(registry.get(CategoryId(0)).unwrap().name, "Person");
        assert_eq!(registry.get(CategoryId(2)).unwrap().name, "Car");
        assert_eq!(registry.get(CategoryId(79)).unwrap().name, "Toothbrush");
        assert!(registry.get(CategoryId(80)).is_none());
    }

    #[test]
    fn lookup_ignores_case_but_keeps_display_name() {
        let registry = CategoryRegistry::coco();
        let category = registry.lookup("tRaFfIc LiGhT").unwrap();
        assert_eq!(category.id, CategoryId(9));
        assert_eq!(category.name, "Traffic Light");
        assert_eq!(registry.lookup("tv").unwrap().name, "TV");
    }

    #[test]
    fn lookup_is_exact() {
        let registry = CategoryRegistry::coco();
        assert!(registry.lookup("traffic").is_none());
        assert!(registry.lookup("cars").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn ids_match_positions() {
        for (index, category) in CategoryRegistry::coco().iter().enumerate() {
            assert_eq!(category.id.index(), index);
        }
    }

    #[test]
    fn rejects_case_insensitive_duplicates() {
        let err = CategoryRegistry::new(&["Car", "Dog", "CAR"]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(CategoryRegistry::new(&[]).is_err());
    }

    #[test]
    fn custom_registry_assigns_positions() {
        let registry = CategoryRegistry::new(&["Cup", "Saucer"]).unwrap();
        assert_eq!(registry.lookup("saucer").unwrap().id, CategoryId(1));
    }
}
