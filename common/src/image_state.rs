//! 作業中の画像データ
//!
//! アップロードした画像、選択点、検出物体、分類名の対応表を保持する。
//! 操作はすべて失敗しない（対象がなければ何もしない）。

use crate::dto::{ClassificationWithObjects, ImageElementResponse, ImageWithAllData};
use crate::parser::element_from_response;
use crate::types::{
    BackgroundPoint, ClassificationSummary, ComparisonDiff, ImageDetails, ImageElement,
    ObjectClassification,
};
use log::debug;
use std::collections::HashMap;

/// 近くの点を削除するときの既定の許容距離（px）
pub const DEFAULT_POINT_TOLERANCE: f64 = 60.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageState {
    images: Vec<ImageDetails>,
    current_image_index: usize,
    classifications: Vec<ObjectClassification>,
    /// サーバー上の分類名 → 表示名
    rename_map: HashMap<String, String>,
    comparison_diff: ComparisonDiff,
    result_id: Option<u64>,
    dataset_id: Option<u64>,
    /// reset() のたびに増える。古いレスポンスの検出に使う
    generation: u64,
}

impl ImageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// すべての作業データを破棄
    pub fn reset(&mut self) {
        let generation = self.generation.wrapping_add(1);
        *self = Self::default();
        self.generation = generation;
        debug!("Image state reset (generation {})", generation);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // =============================================
    // 画像
    // =============================================

    pub fn images(&self) -> &[ImageDetails] {
        &self.images
    }

    pub fn image_ids(&self) -> Vec<u64> {
        self.images.iter().map(|image| image.id).collect()
    }

    pub fn image(&self, image_id: u64) -> Option<&ImageDetails> {
        self.images.iter().find(|image| image.id == image_id)
    }

    fn image_mut(&mut self, image_id: u64) -> Option<&mut ImageDetails> {
        self.images.iter_mut().find(|image| image.id == image_id)
    }

    pub fn current_image_index(&self) -> usize {
        self.current_image_index
    }

    pub fn current_image(&self) -> Option<&ImageDetails> {
        self.images.get(self.current_image_index)
    }

    fn current_image_mut(&mut self) -> Option<&mut ImageDetails> {
        self.images.get_mut(self.current_image_index)
    }

    /// 画像を追加し、そのインデックスを返す
    pub fn add_image(&mut self, image: ImageDetails) -> usize {
        debug!("Adding image {} ({}x{})", image.id, image.width, image.height);
        self.images.push(image);
        self.images.len() - 1
    }

    pub fn select_image(&mut self, index: usize) -> bool {
        if index < self.images.len() {
            self.current_image_index = index;
            true
        } else {
            false
        }
    }

    pub fn set_background_mask(&mut self, image_id: u64, mask: Option<String>) -> bool {
        match self.image_mut(image_id) {
            Some(image) => {
                image.background_mask = mask;
                true
            }
            None => false,
        }
    }

    pub fn result_id(&self) -> Option<u64> {
        self.result_id
    }

    pub fn set_result_id(&mut self, result_id: Option<u64>) {
        self.result_id = result_id;
    }

    pub fn dataset_id(&self) -> Option<u64> {
        self.dataset_id
    }

    pub fn set_dataset_id(&mut self, dataset_id: Option<u64>) {
        self.dataset_id = dataset_id;
    }

    // =============================================
    // 選択点
    // =============================================

    /// 現在の画像の選択点
    pub fn points(&self) -> &[BackgroundPoint] {
        self.current_image()
            .map(|image| image.background_points.as_slice())
            .unwrap_or(&[])
    }

    /// 現在の画像に選択点を追加（重複チェックなし）
    pub fn add_point(&mut self, positive: bool, x: f64, y: f64) {
        if let Some(image) = self.current_image_mut() {
            image.background_points.push(BackgroundPoint::new(positive, x, y));
        }
    }

    pub fn remove_nearby_point(&mut self, x: f64, y: f64) -> Option<BackgroundPoint> {
        self.remove_nearby_point_within(x, y, DEFAULT_POINT_TOLERANCE)
    }

    /// (x, y) に最も近い点を、距離が `tolerance` 未満なら削除
    ///
    /// 距離が同じ点が複数あればリストで先に来る点を削除する
    pub fn remove_nearby_point_within(&mut self, x: f64, y: f64, tolerance: f64) -> Option<BackgroundPoint> {
        let points = &mut self.current_image_mut()?.background_points;

        let mut closest: Option<(usize, f64)> = None;
        for (index, point) in points.iter().enumerate() {
            let distance = point.distance_to(x, y);
            if !distance.is_finite() {
                continue;
            }
            if closest.map_or(true, |(_, best)| distance < best) {
                closest = Some((index, distance));
            }
        }

        match closest {
            Some((index, distance)) if distance < tolerance => Some(points.remove(index)),
            _ => None,
        }
    }

    // =============================================
    // 分類
    // =============================================

    pub fn classifications(&self) -> &[ObjectClassification] {
        &self.classifications
    }

    /// サーバー上の分類名に対応する表示名
    pub fn display_name(&self, server_name: &str) -> Option<&str> {
        self.rename_map.get(server_name).map(String::as_str)
    }

    /// 表示名に対応するサーバー上の分類名（名前順）
    pub fn server_names(&self, display_name: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .rename_map
            .iter()
            .filter(|(_, display)| display.as_str() == display_name)
            .map(|(server, _)| server.clone())
            .collect();
        names.sort();
        names
    }

    /// 分類を登録（表示ON）し、名前の対応表に name → name を追加
    pub fn add_classification(&mut self, name: &str) {
        if !self.classifications.iter().any(|c| c.name == name) {
            self.classifications.push(ObjectClassification {
                name: name.to_string(),
                show_boxes: true,
            });
        }
        self.rename_map
            .entry(name.to_string())
            .or_insert_with(|| name.to_string());
    }

    /// サーバーの分類名を表示名に変換
    ///
    /// 未知の名前は新しい分類として登録してそのまま返す。
    /// 対応表にある名前はクリア後でも表示名を分類一覧に戻す
    pub fn translate_classification(&mut self, server_name: &str) -> String {
        if let Some(display) = self.rename_map.get(server_name).cloned() {
            if !self.classifications.iter().any(|c| c.name == display) {
                self.classifications.push(ObjectClassification {
                    name: display.clone(),
                    show_boxes: true,
                });
            }
            return display;
        }
        self.add_classification(server_name);
        server_name.to_string()
    }

    /// 表示名を変更
    ///
    /// 同じサーバー名が再度届いても新しい名前で表示される
    pub fn rename_classification(&mut self, display_name: &str, new_name: &str) -> bool {
        if display_name == new_name || !self.classifications.iter().any(|c| c.name == display_name) {
            return false;
        }

        for value in self.rename_map.values_mut() {
            if value == display_name {
                *value = new_name.to_string();
            }
        }

        if self.classifications.iter().any(|c| c.name == new_name) {
            self.classifications.retain(|c| c.name != display_name);
        } else if let Some(classification) = self.classifications.iter_mut().find(|c| c.name == display_name) {
            classification.name = new_name.to_string();
        }

        for element in self.images.iter_mut().flat_map(|image| image.elements.iter_mut()) {
            if element.classification.as_deref() == Some(display_name) {
                element.classification = Some(new_name.to_string());
            }
        }

        debug!("Renamed classification {} -> {}", display_name, new_name);
        true
    }

    /// バウンディングボックスの表示を切り替え、新しい値を返す
    pub fn toggle_classification_boxes(&mut self, name: &str) -> Option<bool> {
        let classification = self.classifications.iter_mut().find(|c| c.name == name)?;
        classification.show_boxes = !classification.show_boxes;
        Some(classification.show_boxes)
    }

    // =============================================
    // 検出結果
    // =============================================

    /// 分類付きの結果を画像に反映
    pub fn apply_classifications(&mut self, image_id: u64, classifications: &[ClassificationWithObjects]) -> bool {
        if self.image(image_id).is_none() {
            return false;
        }

        let mut elements = Vec::new();
        for classification in classifications {
            let display = self.translate_classification(&classification.name);
            elements.extend(
                classification
                    .objects
                    .iter()
                    .map(|object| element_from_response(object, Some(display.clone()))),
            );
        }

        self.replace_elements(image_id, elements)
    }

    /// 分類なし（または要素ごとに分類を持つ）結果を画像に反映
    pub fn apply_elements(&mut self, image_id: u64, elements: &[ImageElementResponse]) -> bool {
        if self.image(image_id).is_none() {
            return false;
        }

        let elements: Vec<ImageElement> = elements
            .iter()
            .map(|element| {
                let display = element
                    .classification
                    .as_deref()
                    .map(|name| self.translate_classification(name));
                element_from_response(element, display)
            })
            .collect();

        self.replace_elements(image_id, elements)
    }

    /// サーバーに保存済みの画像データ（物体と選択点）を反映
    pub fn apply_image_data(&mut self, data: &ImageWithAllData) -> bool {
        if !self.apply_elements(data.id, &data.elements) {
            return false;
        }
        if let (Some(image), Some(points)) = (self.image_mut(data.id), &data.background_points) {
            image.background_points = points.data.clone();
        }
        true
    }

    fn replace_elements(&mut self, image_id: u64, elements: Vec<ImageElement>) -> bool {
        match self.image_mut(image_id) {
            Some(image) => {
                debug!("Image {}: {} elements", image_id, elements.len());
                image.selected_leader_ids = elements
                    .iter()
                    .filter(|element| element.is_leader)
                    .map(|element| element.id)
                    .collect();
                image.elements = elements;
                true
            }
            None => false,
        }
    }

    pub fn comparison_diff(&self) -> &ComparisonDiff {
        &self.comparison_diff
    }

    pub fn set_comparison_diff(&mut self, diff: ComparisonDiff) {
        self.comparison_diff = diff;
    }

    // =============================================
    // リーダー
    // =============================================

    /// 現在の画像の要素のリーダー指定を切り替え、新しい値を返す
    pub fn toggle_leader(&mut self, element_id: u64) -> Option<bool> {
        let image = self.current_image_mut()?;
        let element = image.elements.iter_mut().find(|e| e.id == element_id)?;
        element.is_leader = !element.is_leader;

        if element.is_leader {
            image.selected_leader_ids.push(element_id);
        } else {
            image.selected_leader_ids.retain(|&id| id != element_id);
        }
        Some(element.is_leader)
    }

    /// 全画像のリーダー（画像順、選択順）
    pub fn all_leader_ids(&self) -> Vec<u64> {
        self.images
            .iter()
            .flat_map(|image| image.selected_leader_ids.iter().copied())
            .collect()
    }

    // =============================================
    // クリア
    // =============================================

    /// 現在の画像の検出結果と比較差分を破棄
    pub fn clear_current_result(&mut self) {
        self.comparison_diff.clear();
        if let Some(image) = self.current_image_mut() {
            image.elements.clear();
            image.selected_leader_ids.clear();
        }
        self.prune_classifications();
    }

    /// 全画像の検出結果、分類、比較差分を破棄（名前の対応表は残す）
    pub fn clear_all_results(&mut self) {
        self.comparison_diff.clear();
        self.classifications.clear();
        for image in &mut self.images {
            image.elements.clear();
            image.selected_leader_ids.clear();
        }
    }

    /// 現在の画像の選択点とリーダー指定を破棄
    pub fn clear_current_selections(&mut self) {
        if let Some(image) = self.current_image_mut() {
            clear_selections(image);
        }
    }

    pub fn clear_all_selections(&mut self) {
        self.images.iter_mut().for_each(clear_selections);
    }

    fn prune_classifications(&mut self) {
        let images = &self.images;
        self.classifications.retain(|c| {
            images
                .iter()
                .flat_map(|image| image.elements.iter())
                .any(|element| element.classification.as_deref() == Some(c.name.as_str()))
        });
    }

    // =============================================
    // 集計
    // =============================================

    /// 全画像の検出物体
    pub fn all_elements(&self) -> Vec<&ImageElement> {
        self.images.iter().flat_map(|image| image.elements.iter()).collect()
    }

    /// 分類ごとの物体数（全画像を名前でマージ、登録順）
    pub fn classification_summary(&self) -> Vec<ClassificationSummary> {
        let mut summary: Vec<ClassificationSummary> = self
            .classifications
            .iter()
            .map(|c| ClassificationSummary {
                name: c.name.clone(),
                count: 0,
                show_boxes: c.show_boxes,
            })
            .collect();

        for name in self.all_elements().iter().filter_map(|e| e.classification.as_deref()) {
            match summary.iter_mut().find(|s| s.name == name) {
                Some(entry) => entry.count += 1,
                None => summary.push(ClassificationSummary {
                    name: name.to_string(),
                    count: 1,
                    show_boxes: true,
                }),
            }
        }
        summary
    }
}

fn clear_selections(image: &mut ImageDetails) {
    image.background_points.clear();
    image.selected_leader_ids.clear();
    for element in &mut image.elements {
        element.is_leader = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state_with_image(id: u64) -> ImageState {
        let mut state = ImageState::new();
        state.add_image(ImageDetails::new(id, "data:image/png;base64,", 100, 100));
        state
    }

    fn cat_response() -> Vec<ClassificationWithObjects> {
        serde_json::from_value(json!([
            {"name": "cat", "objects": [{"id": 1, "top_left": [0, 0], "bottom_right": [10, 10]}]}
        ]))
        .unwrap()
    }

    // =============================================
    // 選択点 テスト
    // =============================================

    #[test]
    fn test_add_point_without_image_is_noop() {
        let mut state = ImageState::new();
        state.add_point(true, 1.0, 2.0);
        assert!(state.points().is_empty());
    }

    #[test]
    fn test_add_point_keeps_duplicates() {
        let mut state = state_with_image(1);
        state.add_point(true, 5.0, 5.0);
        state.add_point(true, 5.0, 5.0);
        assert_eq!(state.points().len(), 2);
    }

    #[test]
    fn test_remove_nearby_point_empty_is_noop() {
        let mut state = state_with_image(1);
        assert_eq!(state.remove_nearby_point(10.0, 10.0), None);
        assert!(state.points().is_empty());
    }

    #[test]
    fn test_remove_nearby_point_removes_closest() {
        let mut state = state_with_image(1);
        state.add_point(true, 0.0, 0.0);
        state.add_point(false, 50.0, 0.0);

        let removed = state.remove_nearby_point(45.0, 0.0).unwrap();
        assert_eq!(removed.position, [50.0, 0.0]);
        assert_eq!(state.points(), &[BackgroundPoint::new(true, 0.0, 0.0)]);
    }

    #[test]
    fn test_remove_nearby_point_outside_tolerance() {
        let mut state = state_with_image(1);
        state.add_point(true, 0.0, 0.0);

        assert_eq!(state.remove_nearby_point(60.0, 0.0), None);
        assert_eq!(state.points().len(), 1);
        assert!(state.remove_nearby_point(59.9, 0.0).is_some());
    }

    #[test]
    fn test_remove_nearby_point_tie_takes_first() {
        let mut state = state_with_image(1);
        state.add_point(true, 10.0, 0.0);
        state.add_point(false, -10.0, 0.0);

        let removed = state.remove_nearby_point(0.0, 0.0).unwrap();
        assert!(removed.positive);
        assert_eq!(state.points(), &[BackgroundPoint::new(false, -10.0, 0.0)]);
    }

    #[test]
    fn test_remove_nearby_point_removes_at_most_one() {
        let mut state = state_with_image(1);
        for _ in 0..3 {
            state.add_point(true, 1.0, 1.0);
        }
        state.remove_nearby_point_within(1.0, 1.0, 5.0);
        assert_eq!(state.points().len(), 2);
    }

    #[test]
    fn test_points_are_per_image() {
        let mut state = state_with_image(1);
        state.add_image(ImageDetails::new(2, "", 10, 10));
        state.add_point(true, 1.0, 1.0);

        assert!(state.select_image(1));
        assert!(state.points().is_empty());
        assert!(!state.select_image(5));
    }

    // =============================================
    // 分類 テスト
    // =============================================

    #[test]
    fn test_scenario_classified_response() {
        let mut state = state_with_image(7);
        assert!(state.apply_classifications(7, &cat_response()));

        let summary = state.classification_summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].name, "cat");
        assert_eq!(summary[0].count, 1);
        assert!(summary[0].show_boxes);

        let image = state.image(7).unwrap();
        assert_eq!(image.elements.len(), 1);
        assert_eq!(image.elements[0].id, 1);
        assert_eq!(image.elements[0].classification.as_deref(), Some("cat"));
    }

    #[test]
    fn test_apply_to_unknown_image() {
        let mut state = state_with_image(7);
        assert!(!state.apply_classifications(8, &cat_response()));
        assert!(state.classifications().is_empty());
    }

    #[test]
    fn test_add_classification_seeds_mapping() {
        let mut state = ImageState::new();
        state.add_classification("dog");
        state.add_classification("dog");

        assert_eq!(state.classifications().len(), 1);
        assert_eq!(state.display_name("dog"), Some("dog"));
    }

    #[test]
    fn test_translation_idempotent_after_rename() {
        let mut state = state_with_image(7);
        state.apply_classifications(7, &cat_response());
        assert!(state.rename_classification("cat", "kitten"));

        for _ in 0..2 {
            state.apply_classifications(7, &cat_response());
            let image = state.image(7).unwrap();
            assert_eq!(image.elements[0].classification.as_deref(), Some("kitten"));
        }
        assert_eq!(state.translate_classification("cat"), "kitten");
        assert_eq!(state.classifications().len(), 1);
        assert_eq!(state.classifications()[0].name, "kitten");
    }

    #[test]
    fn test_rename_into_existing_merges() {
        let mut state = state_with_image(1);
        let response: Vec<ClassificationWithObjects> = serde_json::from_value(json!([
            {"name": "a", "objects": [{"id": 1, "top_left": [0, 0], "bottom_right": [1, 1]}]},
            {"name": "b", "objects": [{"id": 2, "top_left": [0, 0], "bottom_right": [1, 1]}]}
        ]))
        .unwrap();
        state.apply_classifications(1, &response);

        assert!(state.rename_classification("a", "b"));
        let summary = state.classification_summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].count, 2);
        assert_eq!(state.server_names("b"), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_rename_unknown_classification() {
        let mut state = ImageState::new();
        assert!(!state.rename_classification("ghost", "spirit"));
    }

    #[test]
    fn test_toggle_classification_boxes() {
        let mut state = ImageState::new();
        state.add_classification("cat");
        assert_eq!(state.toggle_classification_boxes("cat"), Some(false));
        assert_eq!(state.toggle_classification_boxes("cat"), Some(true));
        assert_eq!(state.toggle_classification_boxes("dog"), None);
    }

    #[test]
    fn test_summary_merges_across_images() {
        let mut state = state_with_image(1);
        state.add_image(ImageDetails::new(2, "", 10, 10));
        state.apply_classifications(1, &cat_response());
        state.apply_classifications(2, &cat_response());

        let summary = state.classification_summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].count, 2);
        assert_eq!(state.all_elements().len(), 2);
    }

    #[test]
    fn test_apply_image_data_restores_points_and_leaders() {
        let mut state = state_with_image(3);
        let data: ImageWithAllData = serde_json::from_value(json!({
            "id": 3,
            "background_points": {"data": [{"position": [4, 5], "positive": false}]},
            "elements": [
                {"id": 10, "top_left": [0, 0], "bottom_right": [2, 2], "classification": "nut", "is_leader": true},
                {"id": 11, "top_left": [3, 3], "bottom_right": [5, 5]}
            ]
        }))
        .unwrap();

        assert!(state.apply_image_data(&data));
        let image = state.image(3).unwrap();
        assert_eq!(image.background_points, vec![BackgroundPoint::new(false, 4.0, 5.0)]);
        assert_eq!(image.selected_leader_ids, vec![10]);
        assert_eq!(image.elements[1].classification, None);
        assert_eq!(state.classifications().len(), 1);
    }

    // =============================================
    // リーダー / クリア テスト
    // =============================================

    #[test]
    fn test_toggle_leader() {
        let mut state = state_with_image(7);
        state.apply_classifications(7, &cat_response());

        assert_eq!(state.toggle_leader(1), Some(true));
        assert_eq!(state.all_leader_ids(), vec![1]);
        assert_eq!(state.toggle_leader(1), Some(false));
        assert!(state.all_leader_ids().is_empty());
        assert_eq!(state.toggle_leader(99), None);
    }

    #[test]
    fn test_clear_selections_keeps_elements() {
        let mut state = state_with_image(7);
        state.apply_classifications(7, &cat_response());
        state.add_point(true, 1.0, 1.0);
        state.toggle_leader(1);

        state.clear_current_selections();
        let image = state.image(7).unwrap();
        assert!(image.background_points.is_empty());
        assert!(image.selected_leader_ids.is_empty());
        assert_eq!(image.elements.len(), 1);
        assert!(!image.elements[0].is_leader);
    }

    #[test]
    fn test_clear_current_result_prunes_classifications() {
        let mut state = state_with_image(7);
        state.apply_classifications(7, &cat_response());
        state.set_comparison_diff([("cat".to_string(), 2)].into_iter().collect());

        state.clear_current_result();
        assert!(state.all_elements().is_empty());
        assert!(state.classifications().is_empty());
        assert!(state.comparison_diff().is_empty());
    }

    #[test]
    fn test_clear_all_results_keeps_rename_map() {
        let mut state = state_with_image(7);
        state.apply_classifications(7, &cat_response());
        state.rename_classification("cat", "kitten");

        state.clear_all_results();
        assert!(state.classifications().is_empty());
        assert_eq!(state.display_name("cat"), Some("kitten"));
    }

    #[test]
    fn test_renamed_classification_registered_after_clear_all() {
        let mut state = state_with_image(7);
        state.apply_classifications(7, &cat_response());
        state.rename_classification("cat", "kitten");

        state.clear_all_results();
        state.apply_classifications(7, &cat_response());

        assert_eq!(state.image(7).unwrap().elements[0].classification.as_deref(), Some("kitten"));
        assert_eq!(state.classifications().len(), 1);
        assert_eq!(state.classifications()[0].name, "kitten");
        assert_eq!(state.toggle_classification_boxes("kitten"), Some(false));
        assert!(state.rename_classification("kitten", "tiger"));
        assert_eq!(state.display_name("cat"), Some("tiger"));
    }

    #[test]
    fn test_renamed_classification_registered_after_clear_current() {
        let mut state = state_with_image(7);
        state.apply_classifications(7, &cat_response());
        state.rename_classification("cat", "kitten");

        state.clear_current_result();
        assert!(state.classifications().is_empty());
        state.apply_classifications(7, &cat_response());

        let names: Vec<&str> = state.classifications().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["kitten"]);
        assert_eq!(state.classification_summary()[0].count, 1);
    }

    #[test]
    fn test_remove_nearby_point_skips_non_finite() {
        let mut state = state_with_image(1);
        state.add_point(true, f64::NAN, 0.0);
        state.add_point(false, 5.0, 5.0);

        let removed = state.remove_nearby_point(6.0, 6.0).unwrap();
        assert_eq!(removed.position, [5.0, 5.0]);
        assert_eq!(state.points().len(), 1);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut state = state_with_image(7);
        state.apply_classifications(7, &cat_response());
        state.add_point(true, 1.0, 1.0);
        state.set_result_id(Some(3));
        let before = state.generation();

        state.reset();
        assert!(state.images().is_empty());
        assert!(state.current_image().is_none());
        assert!(state.classifications().is_empty());
        assert_eq!(state.display_name("cat"), None);
        assert_eq!(state.result_id(), None);
        assert_eq!(state.current_image_index(), 0);
        assert_eq!(state.generation(), before + 1);
    }
}
