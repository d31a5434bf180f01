//! アプリケーションの制御
//!
//! 画面遷移・画像データ・セッション・設定の各ストアを所有し、
//! APIの呼び出し結果をストアに反映する。
//!
//! リクエスト失敗時:
//! - 送信前の画面に戻し、画像データは変更しない
//! - 401 はログアウトを強制してからエラーを返す
//!
//! 送信時点の画像データの世代（`Ticket`）を記録し、reset() を挟んで
//! 届いたレスポンスは `ClientError::StaleResponse` として破棄する。

use crate::api::{validate_credentials, ApiClient, ServerStatus};
use crate::client::RequestClient;
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::imaging::{self, LoadedImage};
use crate::storage::{FileStore, COOKIES_FILE_NAME, LOCAL_STORAGE_FILE_NAME};
use log::{debug, info, warn};
use objects_counter_common::dto::{
    AcceptBackgroundResponse, ComparisonResponse, GetDatasetResponse, GetResultResponse,
    LeaderClassification, SendBackgroundPointsResponse,
};
use objects_counter_common::parser::dataset_classifications;
use objects_counter_common::storage::cookie_string;
use objects_counter_common::user_state::SESSION_COOKIES;
use objects_counter_common::{
    BackgroundPoint, ComparisonHistoryItem, DatasetClassificationListItem, DatasetListItem,
    ImageDetails, ImageState, ResultHistoryItem, Screen, SettingsState, Theme, UserState,
    ViewState, Workflow,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 各ストアと一覧表示用のデータ
#[derive(Debug, Clone, Default)]
pub struct AppContext {
    pub view: ViewState,
    pub images: ImageState,
    pub user: UserState,
    pub settings: SettingsState,
    pub result_history: Vec<ResultHistoryItem>,
    pub dataset_list: Vec<DatasetListItem>,
    pub comparison_history: Vec<ComparisonHistoryItem>,
}

/// 送信時点の画像データの世代
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    origin: Screen,
    workflow: Workflow,
    ticket: Ticket,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    Added(BackgroundPoint),
    Removed(BackgroundPoint),
    Ignored,
}

/// 背景確定後に進んだ先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// 次の画像の選択点編集へ（インデックス）
    NextImage(usize),
    Finished(Screen),
}

/// データセット作成の入力（リーダーの要素ID → 分類名）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetDraft {
    pub name: String,
    pub leader_names: BTreeMap<u64, String>,
}

pub struct AppController {
    context: AppContext,
    api: ApiClient,
    cookies: FileStore,
    local_storage: FileStore,
    /// ファイル/環境変数から読んだ設定（サーバー上書き前）
    defaults: Config,
    config: Config,
}

impl AppController {
    /// ストアを読み込んで起動
    ///
    /// ローカルストレージに保存されたサーバーアドレスは設定ファイルより優先する
    pub fn new(defaults: Config, cookies: FileStore, mut local_storage: FileStore) -> Result<Self> {
        let mut config = defaults.clone();
        config.apply_override(&SettingsState::saved_server_address(&local_storage));

        let request = RequestClient::new(config.server_uri(), config.log_responses)?;
        let mut context = AppContext::default();
        context.settings.load_from_storage(&mut local_storage, false);

        let mut controller = Self {
            context,
            api: ApiClient::new(request),
            cookies,
            local_storage,
            defaults,
            config,
        };
        controller.restore_session();
        Ok(controller)
    }

    /// 設定ディレクトリのCookie/ローカルストレージを使って起動
    pub fn open(defaults: Config, dir: &Path) -> Result<Self> {
        let cookies = FileStore::load(&dir.join(COOKIES_FILE_NAME));
        let local_storage = FileStore::load(&dir.join(LOCAL_STORAGE_FILE_NAME));
        Self::new(defaults, cookies, local_storage)
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut AppContext {
        &mut self.context
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cookies(&self) -> &FileStore {
        &self.cookies
    }

    pub fn local_storage(&self) -> &FileStore {
        &self.local_storage
    }

    /// Cookieとローカルストレージをファイルに書き出す
    pub fn persist(&mut self) -> Result<()> {
        self.cookies.save()?;
        self.local_storage.save()
    }

    // =============================================
    // 世代とエラー処理
    // =============================================

    pub fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.context.images.generation(),
        }
    }

    fn check(&self, ticket: Ticket) -> Result<()> {
        let current = self.context.images.generation();
        if ticket.generation != current {
            warn!(
                "Dropping response issued for generation {} (now {})",
                ticket.generation, current
            );
            return Err(ClientError::StaleResponse);
        }
        Ok(())
    }

    fn begin(&self) -> Pending {
        Pending {
            origin: self.context.view.current(),
            workflow: self.context.view.workflow(),
            ticket: self.ticket(),
        }
    }

    fn fail(&mut self, pending: Pending, error: ClientError) -> ClientError {
        if matches!(error, ClientError::StaleResponse) {
            return error;
        }
        if error.is_unauthorized() {
            self.force_logout();
        }
        debug!("Request failed on {:?}: {}", self.context.view.current(), error);

        let view = &mut self.context.view;
        view.set_waiting_for_response(false);
        if view.current() != pending.origin {
            view.override_next_workflow(pending.workflow);
            view.transition_to(pending.origin, &mut self.context.images);
        }
        error
    }

    fn finish<T>(&mut self, pending: Pending, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => Err(self.fail(pending, e)),
        }
    }

    fn expect_screen(&self, expected: Screen) -> Result<()> {
        let current = self.context.view.current();
        if current != expected {
            return Err(ClientError::InvalidState(format!(
                "expected {:?}, currently {:?}",
                expected, current
            )));
        }
        Ok(())
    }

    fn current_image_id(&self) -> Result<u64> {
        self.context
            .images
            .current_image()
            .map(|image| image.id)
            .ok_or(ClientError::NoCurrentImage)
    }

    /// 送信前の画像データに戻す（その間に reset() されていれば何もしない）
    fn restore_images(&mut self, ticket: Ticket, snapshot: ImageState) {
        if snapshot.generation() == ticket.generation && self.check(ticket).is_ok() {
            self.context.images = snapshot;
        }
    }

    fn transition_to(&mut self, target: Screen) {
        self.context.view.transition_to(target, &mut self.context.images);
    }

    // =============================================
    // 画面
    // =============================================

    pub fn start_workflow(&mut self, workflow: Workflow) {
        info!("Starting {:?}", workflow);
        self.context.view.select_workflow(workflow);
    }

    pub fn go_back(&mut self) {
        self.context.view.go_back(&mut self.context.images);
    }

    /// メインメニューへ（作業データは破棄される）
    pub fn go_home(&mut self) {
        self.transition_to(Screen::MainMenu);
    }

    pub fn open_account(&mut self) {
        self.transition_to(Screen::UserAccount);
    }

    // =============================================
    // セッション
    // =============================================

    /// Cookieからセッションを復元し、トークンをリクエストに付ける
    pub fn restore_session(&mut self) {
        let cookies = cookie_string(&self.cookies, &SESSION_COOKIES);
        self.context.user.load_from_cookies(&cookies);
        self.api
            .set_token(self.context.user.auth_token().map(str::to_string));
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        validate_credentials(username, password)?;
        let data = self.api.login_user(username, password).await?;

        self.context.user.login(&data, &mut self.cookies);
        self.api
            .set_token(self.context.user.auth_token().map(str::to_string));
        info!("Logged in as {}", data.username);
        Ok(())
    }

    /// 登録に成功したらそのままログインする
    pub async fn register(&mut self, username: &str, password: &str) -> Result<()> {
        self.api.register_user(username, password).await?;
        info!("Registered {}", username);
        self.login(username, password).await
    }

    pub fn logout(&mut self) {
        self.context.user.logout(&mut self.cookies);
        self.api.set_token(None);
    }

    fn force_logout(&mut self) {
        if self.context.user.is_logged_in() {
            warn!("Server rejected the session of {}, logging out", self.context.user.username());
        }
        self.logout();
    }

    /// サーバーの生存確認（トークンが拒否されたらログアウト）
    pub async fn check_server_status(&mut self) -> ServerStatus {
        let timeout = Duration::from_millis(self.config.is_alive_timeout_ms);
        let status = self.api.check_server_status(timeout).await;
        if status == ServerStatus::SessionExpired {
            self.force_logout();
        }
        status
    }

    // =============================================
    // 設定
    // =============================================

    pub fn set_theme(&mut self, theme: Theme) {
        self.context.settings.set_theme(theme, &mut self.local_storage);
    }

    pub fn update_box_certainty_visibility(&mut self, value: bool) {
        self.context
            .settings
            .update_box_certainty_visibility(value, &mut self.local_storage);
    }

    pub fn update_box_label_visibility(&mut self, value: bool) {
        self.context
            .settings
            .update_box_label_visibility(value, &mut self.local_storage);
    }

    pub fn update_element_ids_visibility(&mut self, value: bool) {
        self.context
            .settings
            .update_element_ids_visibility(value, &mut self.local_storage);
    }

    /// サーバーアドレスを保存して以降のリクエストに使う
    pub fn save_server_address(&mut self, address: &str, use_https: bool) {
        SettingsState::save_server_address(&mut self.local_storage, address, use_https);
        self.config.server_address = address.to_string();
        self.config.server_use_https = use_https;
        self.api.request_mut().set_base_uri(self.config.server_uri());
    }

    /// 保存したサーバーアドレスを消し、設定ファイルの値に戻す
    pub fn reset_server_address(&mut self) {
        SettingsState::reset_server_address(&mut self.local_storage);
        self.config.server_address = self.defaults.server_address.clone();
        self.config.server_use_https = self.defaults.server_use_https;
        self.api.request_mut().set_base_uri(self.config.server_uri());
    }

    /// 今回の起動だけサーバーアドレスを差し替える（保存しない）
    pub fn override_server(&mut self, address: &str) {
        self.config.server_address = address.to_string();
        self.api.request_mut().set_base_uri(self.config.server_uri());
    }

    // =============================================
    // 画像のアップロードと選択点
    // =============================================

    /// 画像をアップロードして選択点の編集を始める
    pub async fn upload_images(&mut self, paths: &[PathBuf]) -> Result<usize> {
        let loaded = paths
            .iter()
            .map(|path| imaging::load_image(path))
            .collect::<Result<Vec<_>>>()?;
        if loaded.is_empty() {
            return Err(ClientError::NoImagesFound("no files given".into()));
        }

        let pending = self.begin();
        self.transition_to(Screen::Uploading);
        self.context.view.set_waiting_for_response(true);

        let mut uploaded = Vec::with_capacity(loaded.len());
        for image in loaded {
            let id = self.api.upload_image(&image).await;
            let id = self.finish(pending, id)?;
            debug!("Uploaded {} as image {}", image.file_name, id);
            uploaded.push((id, image));
        }

        let applied = self.apply_uploaded(pending.ticket, uploaded);
        self.finish(pending, applied)
    }

    /// アップロード済みの画像を登録し、最初の画像の編集へ
    pub fn apply_uploaded(&mut self, ticket: Ticket, uploaded: Vec<(u64, LoadedImage)>) -> Result<usize> {
        self.check(ticket)?;

        let first = self.context.images.images().len();
        let count = uploaded.len();
        for (id, image) in uploaded {
            let details = ImageDetails::new(id, image.data_url(), image.width, image.height);
            self.context.images.add_image(details);
        }
        self.context.images.select_image(first);
        self.transition_to(Screen::EditSelectionPoints);

        info!("Uploaded {} images", count);
        Ok(count)
    }

    /// 画像上のクリック（追加モード/削除モードに応じて処理）
    pub fn click(&mut self, x: f64, y: f64) -> ClickOutcome {
        if self.context.view.current() != Screen::EditSelectionPoints {
            return ClickOutcome::Ignored;
        }

        let view = &self.context.view;
        let images = &mut self.context.images;
        if view.is_adding_point {
            let before = images.points().len();
            images.add_point(view.is_positive_point, x, y);
            if images.points().len() > before {
                if let Some(point) = images.points().last() {
                    return ClickOutcome::Added(*point);
                }
            }
            ClickOutcome::Ignored
        } else if view.is_removing_point {
            images
                .remove_nearby_point(x, y)
                .map(ClickOutcome::Removed)
                .unwrap_or(ClickOutcome::Ignored)
        } else {
            ClickOutcome::Ignored
        }
    }

    /// 追加モードに切り替えて指定の極性で点を置く
    pub fn place_point(&mut self, positive: bool, x: f64, y: f64) -> ClickOutcome {
        let view = &mut self.context.view;
        if !view.is_adding_point {
            view.toggle_add_point();
        }
        if view.is_positive_point != positive {
            view.toggle_point_polarity();
        }
        self.click(x, y)
    }

    /// 削除モードに切り替えて近くの点を消す
    pub fn erase_point(&mut self, x: f64, y: f64) -> ClickOutcome {
        if !self.context.view.is_removing_point {
            self.context.view.toggle_remove_point();
        }
        self.click(x, y)
    }

    /// 最後に置いた点を取り消す
    pub fn undo_point(&mut self) -> ClickOutcome {
        match self.context.images.points().last() {
            Some(point) => {
                let [x, y] = point.position;
                self.erase_point(x, y)
            }
            None => ClickOutcome::Ignored,
        }
    }

    /// 選択点を送信し、背景マスクの確認へ
    pub async fn send_selection(&mut self) -> Result<()> {
        self.expect_screen(Screen::EditSelectionPoints)?;
        let image_id = self.current_image_id()?;
        let points = self.context.images.points().to_vec();

        let pending = self.begin();
        self.context.view.set_waiting_for_response(true);

        let response = self.api.send_background_points(image_id, &points).await;
        let response = self.finish(pending, response)?;
        let applied = self.apply_mask(pending.ticket, image_id, &response);
        self.finish(pending, applied)
    }

    pub fn apply_mask(
        &mut self,
        ticket: Ticket,
        image_id: u64,
        response: &SendBackgroundPointsResponse,
    ) -> Result<()> {
        self.check(ticket)?;
        let mask = imaging::mask_to_png_data_url(&response.mask)?;
        if !self.context.images.set_background_mask(image_id, Some(mask)) {
            return Err(ClientError::InvalidState(format!("image {} is not loaded", image_id)));
        }

        let kind = self.context.view.workflow().confirm_kind();
        self.transition_to(Screen::ConfirmSelection(kind));
        Ok(())
    }

    /// 背景マスクを破棄して選択点の編集に戻る
    pub fn reject_selection(&mut self) -> Result<()> {
        if !matches!(self.context.view.current(), Screen::ConfirmSelection(_)) {
            return Err(ClientError::InvalidState("no selection to reject".into()));
        }
        let image_id = self.current_image_id()?;
        self.context.images.set_background_mask(image_id, None);
        self.transition_to(Screen::EditSelectionPoints);
        Ok(())
    }

    /// 背景を確定し、次の画像または作業の次の段階へ
    pub async fn accept_selection(&mut self) -> Result<AcceptOutcome> {
        if !matches!(self.context.view.current(), Screen::ConfirmSelection(_)) {
            return Err(ClientError::InvalidState("no selection to accept".into()));
        }
        let image_id = self.current_image_id()?;
        let skip_classification = self.context.view.workflow().skips_classification();

        let pending = self.begin();
        self.context.view.set_waiting_for_response(true);

        let response = self.api.accept_background(image_id, skip_classification).await;
        let response = self.finish(pending, response)?;

        // 最後の画像で結果の保存に失敗したら検出結果を書き込む前に戻す
        let images = &self.context.images;
        let is_last = images.current_image_index() + 1 >= images.images().len();
        let snapshot = (is_last && self.context.view.workflow() == Workflow::AutomaticCounting)
            .then(|| images.clone());

        let applied = self.apply_accepted(pending.ticket, &response);
        self.finish(pending, applied)?;

        self.advance(pending, snapshot).await
    }

    pub fn apply_accepted(&mut self, ticket: Ticket, response: &AcceptBackgroundResponse) -> Result<()> {
        self.check(ticket)?;
        let (image_id, applied) = match response {
            AcceptBackgroundResponse::Classified(classified) => (
                classified.id,
                self.context
                    .images
                    .apply_classifications(classified.id, &classified.classifications),
            ),
            AcceptBackgroundResponse::NonClassified(data) => {
                (data.id, self.context.images.apply_image_data(data))
            }
        };

        if !applied {
            return Err(ClientError::InvalidState(format!("image {} is not loaded", image_id)));
        }
        Ok(())
    }

    async fn advance(&mut self, pending: Pending, snapshot: Option<ImageState>) -> Result<AcceptOutcome> {
        let next = self.context.images.current_image_index() + 1;
        if next < self.context.images.images().len() {
            self.context.images.select_image(next);
            self.transition_to(Screen::EditSelectionPoints);
            return Ok(AcceptOutcome::NextImage(next));
        }

        let target = match self.context.view.workflow() {
            Workflow::AutomaticCounting => {
                let image_ids = self.context.images.image_ids();
                let result_id = match self.api.create_result(&image_ids, None).await {
                    Ok(result_id) => result_id,
                    Err(e) => {
                        let error = self.fail(pending, e);
                        if let Some(snapshot) = snapshot {
                            self.restore_images(pending.ticket, snapshot);
                        }
                        return Err(error);
                    }
                };
                self.context.images.set_result_id(Some(result_id));
                info!("Saved result {}", result_id);
                Screen::ViewCountingResult
            }
            Workflow::LeaderCounting | Workflow::CreateDataset => Screen::SelectLeaders,
            Workflow::CompareWithDataset => Screen::CompareWithDataset,
            Workflow::PreviewDataset => {
                let error = ClientError::InvalidState("dataset preview has no selection step".into());
                return Err(self.fail(pending, error));
            }
        };

        self.transition_to(target);
        Ok(AcceptOutcome::Finished(target))
    }

    // =============================================
    // リーダー選択
    // =============================================

    /// 編集対象の画像を切り替える
    pub fn select_image(&mut self, index: usize) -> bool {
        self.context.images.select_image(index)
    }

    pub fn toggle_leader(&mut self, element_id: u64) -> Result<bool> {
        self.expect_screen(Screen::SelectLeaders)?;
        self.context
            .images
            .toggle_leader(element_id)
            .ok_or_else(|| ClientError::InvalidState(format!("element {} not found", element_id)))
    }

    /// 選んだリーダーで結果（またはデータセット）を作成
    ///
    /// データセット作成では `draft` の名前とリーダーごとの分類名が必要
    pub async fn submit_leaders(&mut self, draft: Option<&DatasetDraft>) -> Result<Screen> {
        self.expect_screen(Screen::SelectLeaders)?;
        match self.context.view.workflow() {
            Workflow::LeaderCounting => self.count_with_leaders().await,
            Workflow::CreateDataset => {
                let draft = draft
                    .ok_or_else(|| ClientError::Validation("dataset name is required".into()))?;
                self.create_dataset(draft).await
            }
            other => Err(ClientError::InvalidState(format!("{:?} has no leaders", other))),
        }
    }

    async fn count_with_leaders(&mut self) -> Result<Screen> {
        let image_ids = self.context.images.image_ids();
        let leaders = self.context.images.all_leader_ids();
        if leaders.is_empty() {
            return Err(ClientError::Validation("select at least one leader".into()));
        }

        let pending = self.begin();
        self.context.view.set_waiting_for_response(true);

        let result_id = self.api.create_result(&image_ids, Some(&leaders)).await;
        let result_id = self.finish(pending, result_id)?;
        let result = self.api.get_result(result_id).await;
        let result = self.finish(pending, result)?;

        let applied = self.apply_result(pending.ticket, &result);
        self.finish(pending, applied)?;
        self.transition_to(Screen::ViewCountingResult);
        Ok(Screen::ViewCountingResult)
    }

    /// 保存済みの結果を画像に反映
    pub fn apply_result(&mut self, ticket: Ticket, result: &GetResultResponse) -> Result<()> {
        self.check(ticket)?;
        if !self
            .context
            .images
            .apply_classifications(result.image_id, &result.data.classifications)
        {
            return Err(ClientError::InvalidState(format!(
                "image {} is not loaded",
                result.image_id
            )));
        }
        self.context.images.set_result_id(Some(result.id));
        Ok(())
    }

    async fn create_dataset(&mut self, draft: &DatasetDraft) -> Result<Screen> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ClientError::Validation("dataset name is required".into()));
        }

        let mut requests = Vec::new();
        for image in self.context.images.images() {
            let classifications = image
                .selected_leader_ids
                .iter()
                .map(|leader_id| -> Result<LeaderClassification> {
                    let name = draft
                        .leader_names
                        .get(leader_id)
                        .map(|n| n.trim())
                        .filter(|n| !n.is_empty())
                        .ok_or_else(|| {
                            ClientError::Validation(format!("leader {} has no name", leader_id))
                        })?;
                    Ok(LeaderClassification {
                        name: name.to_string(),
                        leader_id: *leader_id,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            requests.push((image.id, classifications));
        }
        if requests.iter().all(|(_, classifications)| classifications.is_empty()) {
            return Err(ClientError::Validation("select at least one leader".into()));
        }

        let pending = self.begin();
        self.context.view.set_waiting_for_response(true);

        let dataset_id = self.api.create_dataset(name, false).await;
        let dataset_id = self.finish(pending, dataset_id)?;
        info!("Created dataset {} ({})", dataset_id, name);

        let mut dataset = None;
        for (image_id, classifications) in &requests {
            let response = self
                .api
                .add_image_to_dataset(dataset_id, *image_id, classifications)
                .await;
            dataset = Some(self.finish(pending, response)?);
        }

        let applied = match &dataset {
            Some(dataset) => self.apply_dataset(pending.ticket, dataset),
            None => Err(ClientError::InvalidState("no images to add".into())),
        };
        self.finish(pending, applied)?;
        self.transition_to(Screen::ViewCountingResult);
        Ok(Screen::ViewCountingResult)
    }

    pub fn apply_dataset(&mut self, ticket: Ticket, dataset: &GetDatasetResponse) -> Result<()> {
        self.check(ticket)?;
        self.context.images.set_dataset_id(Some(dataset.id));
        for image in &dataset.images {
            self.context.images.apply_image_data(image);
        }
        Ok(())
    }

    // =============================================
    // 比較
    // =============================================

    /// 画像群をデータセットと比較して結果を表示
    pub async fn compare_with_dataset(&mut self, dataset_id: u64) -> Result<()> {
        self.expect_screen(Screen::CompareWithDataset)?;
        let image_ids = self.context.images.image_ids();

        let pending = self.begin();
        self.context.view.set_waiting_for_response(true);

        let response = self.api.compare_to_dataset(dataset_id, &image_ids).await;
        let response = self.finish(pending, response)?;
        let applied = self.apply_comparison(pending.ticket, dataset_id, &response);
        self.finish(pending, applied)?;

        self.transition_to(Screen::ViewComparisonResult);
        Ok(())
    }

    pub fn apply_comparison(
        &mut self,
        ticket: Ticket,
        dataset_id: u64,
        response: &ComparisonResponse,
    ) -> Result<()> {
        self.check(ticket)?;
        let images = &mut self.context.images;
        images.set_dataset_id(Some(response.dataset_id.unwrap_or(dataset_id)));
        for image in &response.images {
            images.apply_image_data(image);
        }
        images.set_comparison_diff(response.diff.clone());
        Ok(())
    }

    // =============================================
    // 結果の編集
    // =============================================

    /// 表示中の結果の分類名を変更（サーバーにも反映）
    pub async fn rename_classification(&mut self, display_name: &str, new_name: &str) -> Result<()> {
        if !self.context.view.current().is_result_view() {
            return Err(ClientError::InvalidState("no result is shown".into()));
        }
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ClientError::Validation("classification name is empty".into()));
        }
        if new_name == display_name {
            return Ok(());
        }
        let result_id = self
            .context
            .images
            .result_id()
            .ok_or_else(|| ClientError::InvalidState("result is not saved".into()))?;
        let server_names = self.context.images.server_names(display_name);
        if server_names.is_empty() {
            return Err(ClientError::Validation(format!("unknown classification {}", display_name)));
        }

        let pending = self.begin();
        self.context.view.set_waiting_for_response(true);

        // 途中で失敗するとサーバー側は一部だけ改名された状態で残る
        for (done, server_name) in server_names.iter().enumerate() {
            let count = self
                .api
                .rename_result_classification(result_id, server_name, new_name)
                .await;
            if count.is_err() && done > 0 {
                warn!(
                    "Rename of {} stopped after {} of {} server classifications",
                    display_name,
                    done,
                    server_names.len()
                );
            }
            let count = self.finish(pending, count)?;
            debug!("Renamed {} objects from {}", count, server_name);
        }

        self.check(pending.ticket)?;
        self.context.images.rename_classification(display_name, new_name);
        self.context.view.set_waiting_for_response(false);
        Ok(())
    }

    /// 結果を破棄して選択点の編集からやり直す（全画像）
    ///
    /// サーバーに保存済みの結果は消さない
    pub fn discard_result(&mut self) -> Result<()> {
        self.expect_discardable()?;
        let images = &mut self.context.images;
        images.clear_all_results();
        images.clear_all_selections();
        for id in images.image_ids() {
            images.set_background_mask(id, None);
        }
        images.set_result_id(None);
        images.set_dataset_id(None);
        images.select_image(0);

        info!("Discarded result, restarting point selection");
        self.transition_to(Screen::EditSelectionPoints);
        Ok(())
    }

    /// 編集中の画像だけ結果を破棄して選択点の編集に戻る
    pub fn discard_current_result(&mut self) -> Result<()> {
        self.expect_discardable()?;
        let image_id = self.current_image_id()?;
        let images = &mut self.context.images;
        images.clear_current_result();
        images.clear_current_selections();
        images.set_background_mask(image_id, None);
        images.set_result_id(None);

        self.transition_to(Screen::EditSelectionPoints);
        Ok(())
    }

    fn expect_discardable(&self) -> Result<()> {
        let current = self.context.view.current();
        let workflow = self.context.view.workflow();
        if !(current.is_result_view() || current == Screen::SelectLeaders) || workflow == Workflow::PreviewDataset {
            return Err(ClientError::InvalidState(format!(
                "no result to discard on {:?}",
                current
            )));
        }
        if self.context.images.images().is_empty() {
            return Err(ClientError::NoCurrentImage);
        }
        Ok(())
    }

    // =============================================
    // 履歴・データセット一覧
    // =============================================

    pub async fn browse_results(&mut self) -> Result<&[ResultHistoryItem]> {
        let pending = self.begin();
        let items = self.api.result_history().await;
        self.context.result_history = self.finish(pending, items)?;
        self.transition_to(Screen::BrowseResultHistory);
        Ok(&self.context.result_history)
    }

    pub async fn browse_datasets(&mut self) -> Result<&[DatasetListItem]> {
        let pending = self.begin();
        let items = self.api.dataset_list().await;
        self.context.dataset_list = self.finish(pending, items)?;
        self.transition_to(Screen::BrowseDatasets);
        Ok(&self.context.dataset_list)
    }

    pub async fn browse_comparisons(&mut self) -> Result<&[ComparisonHistoryItem]> {
        let pending = self.begin();
        let items = self.api.comparison_history().await;
        self.context.comparison_history = self.finish(pending, items)?;
        self.transition_to(Screen::BrowseComparisonHistory);
        Ok(&self.context.comparison_history)
    }

    async fn download_image(&self, image_id: u64) -> Result<LoadedImage> {
        let bytes = self.api.get_image(image_id).await?;
        imaging::image_from_bytes(image_id.to_string(), bytes)
    }

    /// 保存済みの結果を開く
    pub async fn open_result(&mut self, result_id: u64) -> Result<()> {
        let pending = self.begin();
        let result = self.api.get_result(result_id).await;
        let result = self.finish(pending, result)?;
        let image = self.download_image(result.image_id).await;
        let image = self.finish(pending, image)?;

        self.check(pending.ticket)?;
        self.context.images.reset();
        let details = ImageDetails::new(result.image_id, image.data_url(), image.width, image.height);
        self.context.images.add_image(details);
        let ticket = self.ticket();
        self.apply_result(ticket, &result)?;

        self.context.view.override_next_workflow(Workflow::AutomaticCounting);
        self.transition_to(Screen::ViewCountingResult);
        Ok(())
    }

    /// データセットの画像と分類を表示
    pub async fn preview_dataset(&mut self, dataset_id: u64) -> Result<Vec<DatasetClassificationListItem>> {
        let pending = self.begin();
        let dataset = self.api.get_dataset(dataset_id).await;
        let dataset = self.finish(pending, dataset)?;

        let mut downloaded = Vec::with_capacity(dataset.images.len());
        for image in &dataset.images {
            let loaded = self.download_image(image.id).await;
            downloaded.push((image.id, self.finish(pending, loaded)?));
        }

        self.check(pending.ticket)?;
        self.context.images.reset();
        for (id, image) in downloaded {
            let details = ImageDetails::new(id, image.data_url(), image.width, image.height);
            self.context.images.add_image(details);
        }
        let ticket = self.ticket();
        self.apply_dataset(ticket, &dataset)?;

        self.context.view.override_next_workflow(Workflow::PreviewDataset);
        self.transition_to(Screen::ViewCountingResult);
        Ok(dataset_classifications(&dataset))
    }

    pub async fn delete_result(&mut self, result_id: u64) -> Result<()> {
        let pending = self.begin();
        let deleted = self.api.delete_result(result_id).await;
        self.finish(pending, deleted)?;
        self.context.result_history.retain(|item| item.id != result_id);
        info!("Deleted result {}", result_id);
        Ok(())
    }

    pub async fn delete_dataset(&mut self, dataset_id: u64) -> Result<()> {
        let pending = self.begin();
        let deleted = self.api.delete_dataset(dataset_id).await;
        self.finish(pending, deleted)?;
        self.context.dataset_list.retain(|item| item.id != dataset_id);
        info!("Deleted dataset {}", dataset_id);
        Ok(())
    }

    pub async fn rename_dataset(&mut self, dataset_id: u64, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::Validation("dataset name is required".into()));
        }
        let unfinished = self
            .context
            .dataset_list
            .iter()
            .find(|item| item.id == dataset_id)
            .map(|item| item.unfinished)
            .unwrap_or(false);

        let pending = self.begin();
        let renamed = self.api.rename_dataset(dataset_id, name, unfinished).await;
        let renamed = self.finish(pending, renamed)?;

        if let Some(item) = self.context.dataset_list.iter_mut().find(|item| item.id == dataset_id) {
            item.name = renamed.name;
        }
        Ok(())
    }

    pub async fn delete_comparison(&mut self, comparison_id: u64) -> Result<()> {
        let pending = self.begin();
        let deleted = self.api.delete_comparison(comparison_id).await;
        self.finish(pending, deleted)?;
        self.context.comparison_history.retain(|item| item.id != comparison_id);
        info!("Deleted comparison {}", comparison_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objects_counter_common::dto::{ClassificationWithObjects, ImageWithClassifications};
    use objects_counter_common::{KeyValueStore, Toolbar};
    use serde_json::json;

    fn controller() -> (tempfile::TempDir, AppController) {
        let dir = tempfile::tempdir().unwrap();
        let controller = AppController::open(Config::default(), dir.path()).unwrap();
        (dir, controller)
    }

    fn with_uploaded_image(controller: &mut AppController, image_id: u64) {
        let ticket = controller.ticket();
        let image = LoadedImage {
            file_name: "a.png".into(),
            bytes: vec![],
            mime_type: "image/png",
            width: 100,
            height: 80,
        };
        controller.apply_uploaded(ticket, vec![(image_id, image)]).unwrap();
    }

    fn classified(image_id: u64) -> AcceptBackgroundResponse {
        AcceptBackgroundResponse::Classified(ImageWithClassifications {
            id: image_id,
            classifications: serde_json::from_value::<Vec<ClassificationWithObjects>>(json!([
                {"name": "cat", "objects": [{"id": 1, "top_left": [0, 0], "bottom_right": [10, 10]}]}
            ]))
            .unwrap(),
            count: 1,
        })
    }

    #[test]
    fn test_apply_uploaded_enters_point_editing() {
        let (_dir, mut controller) = controller();
        with_uploaded_image(&mut controller, 7);

        let context = controller.context();
        assert_eq!(context.view.current(), Screen::EditSelectionPoints);
        assert_eq!(context.view.toolbar(), Toolbar::EditPoints);
        assert_eq!(context.images.current_image().unwrap().id, 7);
    }

    #[test]
    fn test_click_follows_mode() {
        let (_dir, mut controller) = controller();
        with_uploaded_image(&mut controller, 7);

        assert_eq!(controller.click(5.0, 5.0), ClickOutcome::Ignored);

        controller.context_mut().view.toggle_add_point();
        assert!(matches!(controller.click(5.0, 5.0), ClickOutcome::Added(p) if p.positive));
        controller.context_mut().view.toggle_point_polarity();
        assert!(matches!(controller.click(50.0, 50.0), ClickOutcome::Added(p) if !p.positive));

        controller.context_mut().view.toggle_remove_point();
        assert!(matches!(controller.click(6.0, 6.0), ClickOutcome::Removed(p) if p.position == [5.0, 5.0]));
        assert_eq!(controller.context().images.points().len(), 1);
    }

    #[test]
    fn test_place_and_undo_point() {
        let (_dir, mut controller) = controller();
        with_uploaded_image(&mut controller, 7);

        assert!(matches!(controller.place_point(false, 3.0, 4.0), ClickOutcome::Added(p) if !p.positive));
        assert!(matches!(controller.place_point(true, 40.0, 40.0), ClickOutcome::Added(p) if p.positive));
        assert!(matches!(controller.undo_point(), ClickOutcome::Removed(p) if p.position == [40.0, 40.0]));
        assert_eq!(controller.context().images.points().len(), 1);

        controller.undo_point();
        assert_eq!(controller.undo_point(), ClickOutcome::Ignored);
    }

    #[test]
    fn test_mask_then_reject() {
        let (_dir, mut controller) = controller();
        with_uploaded_image(&mut controller, 7);

        let ticket = controller.ticket();
        let response = SendBackgroundPointsResponse { mask: vec![vec![true, false]] };
        controller.apply_mask(ticket, 7, &response).unwrap();
        assert!(matches!(controller.context().view.current(), Screen::ConfirmSelection(_)));
        assert!(controller.context().images.image(7).unwrap().background_mask.is_some());

        controller.reject_selection().unwrap();
        assert_eq!(controller.context().view.current(), Screen::EditSelectionPoints);
        assert!(controller.context().images.image(7).unwrap().background_mask.is_none());
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let (_dir, mut controller) = controller();
        with_uploaded_image(&mut controller, 7);

        let ticket = controller.ticket();
        controller.go_home();
        with_uploaded_image(&mut controller, 8);

        let result = controller.apply_accepted(ticket, &classified(8));
        assert!(matches!(result, Err(ClientError::StaleResponse)));
        assert!(controller.context().images.image(8).unwrap().elements.is_empty());
    }

    #[test]
    fn test_apply_accepted_scenario() {
        let (_dir, mut controller) = controller();
        with_uploaded_image(&mut controller, 7);

        let ticket = controller.ticket();
        controller.apply_accepted(ticket, &classified(7)).unwrap();

        let summary = controller.context().images.classification_summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].name, "cat");
        assert_eq!(summary[0].count, 1);
        assert_eq!(controller.context().images.image(7).unwrap().elements[0].id, 1);
    }

    #[test]
    fn test_fail_returns_to_origin_and_keeps_workflow() {
        let (_dir, mut controller) = controller();
        controller.start_workflow(Workflow::LeaderCounting);
        let pending = controller.begin();
        controller.transition_to(Screen::Uploading);

        let error = controller.fail(pending, ClientError::InvalidState("boom".into()));
        assert!(matches!(error, ClientError::InvalidState(_)));
        assert_eq!(controller.context().view.current(), Screen::MainMenu);
        assert_eq!(controller.context().view.workflow(), Workflow::LeaderCounting);
    }

    #[test]
    fn test_unauthorized_forces_logout() {
        let dir = tempfile::tempdir().unwrap();
        let mut cookies = FileStore::load(&dir.path().join(COOKIES_FILE_NAME));
        cookies.set("username", "alice");
        cookies.set("userId", "5");
        cookies.set("userToken", "t0k3n");
        let local = FileStore::load(&dir.path().join(LOCAL_STORAGE_FILE_NAME));
        let mut controller = AppController::new(Config::default(), cookies, local).unwrap();
        assert!(controller.context().user.is_logged_in());
        assert_eq!(controller.api().request().token(), Some("t0k3n"));

        let pending = controller.begin();
        controller.fail(pending, ClientError::Unauthorized);

        assert_eq!(controller.context().user.username(), "Guest");
        assert_eq!(controller.context().user.token(), "");
        assert_eq!(controller.cookies().get("userToken"), None);
        assert_eq!(controller.api().request().token(), None);
    }

    #[test]
    fn test_saved_server_address_wins_over_config() {
        let dir = tempfile::tempdir().unwrap();
        let cookies = FileStore::load(&dir.path().join(COOKIES_FILE_NAME));
        let mut local = FileStore::load(&dir.path().join(LOCAL_STORAGE_FILE_NAME));
        SettingsState::save_server_address(&mut local, "10.0.0.2:8000", true);

        let mut controller = AppController::new(Config::default(), cookies, local).unwrap();
        assert_eq!(controller.api().request().base_uri(), "https://10.0.0.2:8000");

        controller.override_server("127.0.0.1:9999");
        assert_eq!(controller.api().request().base_uri(), "https://127.0.0.1:9999");

        controller.reset_server_address();
        assert_eq!(controller.api().request().base_uri(), "http://localhost:5000");
    }

    /// 検出結果つきで結果画面を表示した状態を作る
    fn with_counting_result(controller: &mut AppController, image_id: u64) {
        with_uploaded_image(controller, image_id);
        controller.place_point(true, 5.0, 5.0);
        let ticket = controller.ticket();
        controller.apply_accepted(ticket, &classified(image_id)).unwrap();
        controller.context_mut().images.set_result_id(Some(3));
        controller.transition_to(Screen::ViewCountingResult);
    }

    #[test]
    fn test_discard_result_restarts_point_editing() {
        let (_dir, mut controller) = controller();
        controller.start_workflow(Workflow::AutomaticCounting);
        with_counting_result(&mut controller, 7);

        controller.discard_result().unwrap();

        let context = controller.context();
        assert_eq!(context.view.current(), Screen::EditSelectionPoints);
        assert_eq!(context.view.workflow(), Workflow::AutomaticCounting);
        assert!(context.images.image(7).unwrap().elements.is_empty());
        assert!(context.images.points().is_empty());
        assert!(context.images.classifications().is_empty());
        assert_eq!(context.images.result_id(), None);
        assert_eq!(context.images.current_image().unwrap().id, 7);

        assert!(matches!(controller.discard_result(), Err(ClientError::InvalidState(_))));
    }

    #[test]
    fn test_discard_current_result_keeps_other_images() {
        let (_dir, mut controller) = controller();
        with_uploaded_image(&mut controller, 8);
        with_counting_result(&mut controller, 7);
        let ticket = controller.ticket();
        controller.apply_accepted(ticket, &classified(8)).unwrap();

        controller.discard_current_result().unwrap();

        let images = &controller.context().images;
        assert_eq!(controller.context().view.current(), Screen::EditSelectionPoints);
        assert!(images.image(7).unwrap().elements.is_empty());
        assert_eq!(images.image(8).unwrap().elements.len(), 1);
        assert_eq!(images.classification_summary()[0].count, 1);
    }

    #[test]
    fn test_discard_keeps_renamed_display_name() {
        let (_dir, mut controller) = controller();
        with_counting_result(&mut controller, 7);
        controller.context_mut().images.rename_classification("cat", "kitten");

        controller.discard_result().unwrap();
        let ticket = controller.ticket();
        controller.apply_accepted(ticket, &classified(7)).unwrap();

        let summary = controller.context().images.classification_summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].name, "kitten");
        assert_eq!(summary[0].count, 1);
        assert_eq!(controller.context().images.server_names("kitten"), vec!["cat".to_string()]);
    }

    #[test]
    fn test_discard_rejected_for_dataset_preview() {
        let (_dir, mut controller) = controller();
        controller.start_workflow(Workflow::PreviewDataset);
        with_counting_result(&mut controller, 7);
        assert!(matches!(controller.discard_result(), Err(ClientError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_rename_to_same_name_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            server_address: "127.0.0.1:9".into(),
            ..Config::default()
        };
        let mut controller = AppController::open(config, dir.path()).unwrap();
        with_counting_result(&mut controller, 7);

        controller.rename_classification("cat", " cat ").await.unwrap();

        assert_eq!(controller.context().view.current(), Screen::ViewCountingResult);
        assert_eq!(controller.context().images.classification_summary()[0].name, "cat");
    }

    #[test]
    fn test_toggle_leader_requires_leader_screen() {
        let (_dir, mut controller) = controller();
        with_uploaded_image(&mut controller, 7);
        assert!(matches!(controller.toggle_leader(1), Err(ClientError::InvalidState(_))));
    }
}
