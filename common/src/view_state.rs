//! 画面遷移ステートマシン
//!
//! 「今どの画面か」「どのツールバーか」「どの作業中か」を一元管理する。
//! 画面・ツールバーは列挙型で持ち、描画側へのマッピングは純粋関数で行う。
//! I/Oは行わないので失敗しない。

use crate::image_state::ImageState;
use log::debug;

/// 確認画面の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmKind {
    Counting,
    Dataset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    MainMenu,
    UserAccount,
    Uploading,
    EditSelectionPoints,
    ConfirmSelection(ConfirmKind),
    ViewCountingResult,
    SelectLeaders,
    CompareWithDataset,
    ViewComparisonResult,
    BrowseResultHistory,
    BrowseComparisonHistory,
    BrowseDatasets,
}

impl Screen {
    pub fn is_browse(&self) -> bool {
        matches!(
            self,
            Screen::BrowseResultHistory | Screen::BrowseComparisonHistory | Screen::BrowseDatasets
        )
    }

    pub fn is_result_view(&self) -> bool {
        matches!(self, Screen::ViewCountingResult | Screen::ViewComparisonResult)
    }
}

/// ユーザーが選んだ作業
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Workflow {
    #[default]
    AutomaticCounting,
    LeaderCounting,
    CreateDataset,
    CompareWithDataset,
    PreviewDataset,
}

impl Workflow {
    /// 確認画面の種類
    pub fn confirm_kind(&self) -> ConfirmKind {
        match self {
            Workflow::CreateDataset => ConfirmKind::Dataset,
            _ => ConfirmKind::Counting,
        }
    }

    /// 背景確定時にサーバー側の分類を省略するか
    pub fn skips_classification(&self) -> bool {
        !matches!(self, Workflow::AutomaticCounting)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toolbar {
    None,
    EditPoints,
    ConfirmCounting,
    ConfirmDataset,
    CountingResult,
    DatasetPreview,
    SelectLeaders,
    SelectDataset,
    ComparisonResult,
}

/// 描画側のビュー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenComponent {
    MainView,
    AccountView,
    LoadingView,
    ImageView,
    HistoryView,
    DatasetsView,
}

/// 画面に対応する描画ビュー
pub fn screen_component(screen: Screen) -> ScreenComponent {
    match screen {
        Screen::MainMenu => ScreenComponent::MainView,
        Screen::UserAccount => ScreenComponent::AccountView,
        Screen::Uploading => ScreenComponent::LoadingView,
        Screen::EditSelectionPoints
        | Screen::ConfirmSelection(_)
        | Screen::ViewCountingResult
        | Screen::SelectLeaders
        | Screen::CompareWithDataset
        | Screen::ViewComparisonResult => ScreenComponent::ImageView,
        Screen::BrowseResultHistory | Screen::BrowseComparisonHistory => ScreenComponent::HistoryView,
        Screen::BrowseDatasets => ScreenComponent::DatasetsView,
    }
}

/// (画面, 作業) から決まるツールバー
pub fn toolbar_for(screen: Screen, workflow: Workflow) -> Toolbar {
    match screen {
        Screen::MainMenu
        | Screen::UserAccount
        | Screen::Uploading
        | Screen::BrowseResultHistory
        | Screen::BrowseComparisonHistory
        | Screen::BrowseDatasets => Toolbar::None,
        Screen::EditSelectionPoints => Toolbar::EditPoints,
        Screen::ConfirmSelection(ConfirmKind::Counting) => Toolbar::ConfirmCounting,
        Screen::ConfirmSelection(ConfirmKind::Dataset) => Toolbar::ConfirmDataset,
        Screen::ViewCountingResult => match workflow {
            Workflow::CreateDataset | Workflow::PreviewDataset => Toolbar::DatasetPreview,
            _ => Toolbar::CountingResult,
        },
        Screen::SelectLeaders => Toolbar::SelectLeaders,
        Screen::CompareWithDataset => Toolbar::SelectDataset,
        Screen::ViewComparisonResult => Toolbar::ComparisonResult,
    }
}

/// 結果画面のタイトル
pub fn result_title(workflow: Workflow) -> &'static str {
    match workflow {
        Workflow::CompareWithDataset => "Comparison",
        Workflow::CreateDataset => "Create dataset",
        _ => "Counted elements",
    }
}

fn screen_title(screen: Screen, workflow: Workflow) -> &'static str {
    match screen {
        Screen::MainMenu | Screen::Uploading => "",
        Screen::UserAccount => "Account",
        Screen::EditSelectionPoints => "Select background",
        Screen::ConfirmSelection(_) => "Confirm selection",
        Screen::ViewCountingResult | Screen::ViewComparisonResult => result_title(workflow),
        Screen::SelectLeaders => "Select leaders",
        Screen::CompareWithDataset => "Select dataset",
        Screen::BrowseResultHistory => "Result history",
        Screen::BrowseComparisonHistory => "Comparison history",
        Screen::BrowseDatasets => "Datasets",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    current: Screen,
    previous: Screen,
    workflow: Workflow,
    pending_workflow: Option<Workflow>,
    toolbar: Toolbar,
    nav_title: &'static str,

    pub is_adding_point: bool,
    pub is_removing_point: bool,
    pub is_waiting_for_response: bool,
    /// 追加する選択点の極性（true: 前景）
    pub is_positive_point: bool,

    pub show_points: bool,
    pub show_background: bool,
    pub show_boxes: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            current: Screen::MainMenu,
            previous: Screen::MainMenu,
            workflow: Workflow::default(),
            pending_workflow: None,
            toolbar: Toolbar::None,
            nav_title: "",
            is_adding_point: false,
            is_removing_point: false,
            is_waiting_for_response: false,
            is_positive_point: true,
            show_points: false,
            show_background: false,
            show_boxes: false,
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Screen {
        self.current
    }

    pub fn previous(&self) -> Screen {
        self.previous
    }

    pub fn workflow(&self) -> Workflow {
        self.workflow
    }

    pub fn toolbar(&self) -> Toolbar {
        self.toolbar
    }

    pub fn nav_title(&self) -> &'static str {
        self.nav_title
    }

    pub fn component(&self) -> ScreenComponent {
        screen_component(self.current)
    }

    pub fn select_workflow(&mut self, workflow: Workflow) {
        self.workflow = workflow;
        self.toolbar = toolbar_for(self.current, workflow);
    }

    /// 次の遷移で作業の既定値リセットを上書きする
    pub fn override_next_workflow(&mut self, workflow: Workflow) {
        self.pending_workflow = Some(workflow);
    }

    /// 画面を遷移する（現在の画面を変える唯一の操作）
    ///
    /// MainMenu への遷移は画像データのリセットを先に行う
    pub fn transition_to(&mut self, target: Screen, images: &mut ImageState) {
        debug!("View transition {:?} -> {:?}", self.current, target);

        self.previous = self.current;
        self.is_adding_point = false;
        self.is_removing_point = false;
        self.is_waiting_for_response = false;

        let pending = self.pending_workflow.take();

        if target == Screen::MainMenu {
            images.reset();
            let previous = self.previous;
            *self = Self::default();
            self.previous = previous;
            if let Some(workflow) = pending {
                self.workflow = workflow;
            }
            return;
        }

        if target == Screen::UserAccount || target.is_browse() {
            self.workflow = pending.unwrap_or_default();
        } else if let Some(workflow) = pending {
            self.workflow = workflow;
        }

        self.current = target;
        self.toolbar = toolbar_for(target, self.workflow);
        self.nav_title = screen_title(target, self.workflow);

        self.show_points = matches!(target, Screen::EditSelectionPoints | Screen::ConfirmSelection(_));
        self.show_background = matches!(target, Screen::ConfirmSelection(_));
        self.show_boxes = target.is_result_view() || target == Screen::SelectLeaders;
    }

    /// 直前の画面に戻る
    pub fn go_back(&mut self, images: &mut ImageState) {
        let previous = self.previous;
        self.transition_to(previous, images);
    }

    pub fn toggle_add_point(&mut self) {
        self.is_adding_point = !self.is_adding_point;
        if self.is_adding_point {
            self.is_removing_point = false;
        }
    }

    pub fn toggle_remove_point(&mut self) {
        self.is_removing_point = !self.is_removing_point;
        if self.is_removing_point {
            self.is_adding_point = false;
        }
    }

    pub fn toggle_point_polarity(&mut self) {
        self.is_positive_point = !self.is_positive_point;
    }

    pub fn set_waiting_for_response(&mut self, waiting: bool) {
        self.is_waiting_for_response = waiting;
    }
}
