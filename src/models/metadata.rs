use serde::Deserialize;
use std::collections::BTreeMap;

/// YOLO 默认输入尺寸
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);

/// 从 ONNX 自定义元数据中解析出的模型信息
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    /// 类别 id -> 名称
    pub names: BTreeMap<usize, String>,
    /// 输入尺寸 (height, width)
    pub input_size: (u32, u32),
    /// 导出任务类型
    pub task: Option<String>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            names: BTreeMap::new(),
            input_size: DEFAULT_INPUT_SIZE,
            task: None,
        }
    }
}

impl ModelMetadata {
    /// 由 Ultralytics 导出的键值构建
    ///
    /// `names` 形如 `{0: 'poubelle_pleine', 1: 'poubelle_vide'}`，
    /// `imgsz` 形如 `[640, 640]`。
    pub fn from_custom(names: Option<&str>, imgsz: Option<&str>, task: Option<&str>) -> Self {
        let names = names.map(parse_names).unwrap_or_default();
        let input_size = imgsz.and_then(parse_imgsz).unwrap_or(DEFAULT_INPUT_SIZE);

        Self {
            names,
            input_size,
            task: task.map(|t| t.trim().to_string()),
        }
    }

    /// 按类别数补齐缺失的名称
    pub fn fill_missing_names(&mut self, num_classes: usize) {
        for id in 0..num_classes {
            self.names.entry(id).or_insert_with(|| format!("class_{}", id));
        }
    }

    /// 以输出张量推断出的类别数为准补齐名称表
    pub fn align_with_output(&mut self, output_classes: Option<usize>) {
        match output_classes {
            Some(num_classes) => {
                if self.names.len() != num_classes {
                    tracing::warn!(
                        "Model metadata lists {} class names but the output has {} classes",
                        self.names.len(),
                        num_classes
                    );
                }
                self.fill_missing_names(num_classes);
            }
            None if self.names.is_empty() => {
                tracing::warn!("Class count unknown: no names metadata and a dynamic output shape");
            }
            None => {}
        }
    }

    pub fn class_name(&self, class_id: usize) -> String {
        self.names
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }
}

/// 解析 `{0: 'a', 1: "b"}` 形式的类别表
///
/// Ultralytics 写入的是 Python dict 的 repr，同时也是合法的 YAML flow mapping。
pub fn parse_names(raw: &str) -> BTreeMap<usize, String> {
    let parsed: BTreeMap<usize, serde_yaml::Value> = match serde_yaml::from_str(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Unparseable class names metadata {:?}: {}", raw, e);
            return BTreeMap::new();
        }
    };

    parsed
        .into_iter()
        .filter_map(|(id, value)| {
            let name = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((id, name))
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImgSz {
    Square(u32),
    Pair([u32; 2]),
}

/// 解析 `[640, 640]` 或 `640`；非正尺寸视为无效
pub fn parse_imgsz(raw: &str) -> Option<(u32, u32)> {
    let size = match serde_yaml::from_str::<ImgSz>(raw).ok()? {
        ImgSz::Square(size) => (size, size),
        ImgSz::Pair([h, w]) => (h, w),
    };

    if size.0 == 0 || size.1 == 0 {
        tracing::warn!("Ignoring non-positive imgsz metadata: {}", raw);
        return None;
    }
    Some(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ultralytics_names() {
        let names = parse_names("{0: 'poubelle_pleine', 1: 'poubelle_vide'}");
        assert_eq!(names.len(), 2);
        assert_eq!(names[&0], "poubelle_pleine");
        assert_eq!(names[&1], "poubelle_vide");
    }

    #[test]
    fn parses_names_with_double_quotes_and_spaces() {
        let names = parse_names(r#"{0: "full bin", 1: "empty, clean bin"}"#);
        assert_eq!(names[&0], "full bin");
        assert_eq!(names[&1], "empty, clean bin");
    }

    #[test]
    fn parses_imgsz_forms() {
        assert_eq!(parse_imgsz("[640, 640]"), Some((640, 640)));
        assert_eq!(parse_imgsz("[480, 640]"), Some((480, 640)));
        assert_eq!(parse_imgsz("320"), Some((320, 320)));
        assert_eq!(parse_imgsz("nonsense"), None);
    }

    #[test]
    fn zero_imgsz_falls_back_to_default() {
        assert_eq!(parse_imgsz("0"), None);
        assert_eq!(parse_imgsz("[0, 640]"), None);

        let meta = ModelMetadata::from_custom(None, Some("[0, 0]"), None);
        assert_eq!(meta.input_size, DEFAULT_INPUT_SIZE);
    }

    #[test]
    fn parses_names_with_embedded_quotes() {
        let names = parse_names(r#"{0: "it's full", 1: 'say "empty"'}"#);
        assert_eq!(names[&0], "it's full");
        assert_eq!(names[&1], "say \"empty\"");
    }

    #[test]
    fn malformed_names_yield_empty_table() {
        assert!(parse_names("{0: 'unterminated").is_empty());
    }

    #[test]
    fn output_class_count_fills_missing_names() {
        let mut meta = ModelMetadata::from_custom(None, None, None);
        meta.align_with_output(Some(2));
        assert_eq!(meta.names.len(), 2);
        assert_eq!(meta.names[&0], "class_0");
        assert_eq!(meta.names[&1], "class_1");

        let mut meta = ModelMetadata::from_custom(Some("{0: 'poubelle_pleine'}"), None, None);
        meta.align_with_output(Some(2));
        assert_eq!(meta.names[&0], "poubelle_pleine");
        assert_eq!(meta.names[&1], "class_1");

        let mut meta = ModelMetadata::from_custom(Some("{0: 'a', 1: 'b'}"), None, None);
        meta.align_with_output(None);
        assert_eq!(meta.names.len(), 2);
    }

    #[test]
    fn missing_metadata_uses_defaults() {
        let mut meta = ModelMetadata::from_custom(None, None, None);
        assert_eq!(meta.input_size, DEFAULT_INPUT_SIZE);
        meta.fill_missing_names(2);
        assert_eq!(meta.class_name(1), "class_1");
    }
}
