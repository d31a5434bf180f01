use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "objects-counter")]
#[command(about = "画像の物体を数える・データセットと比較するクライアント", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// サーバーアドレス（host:port、今回の実行のみ）
    #[arg(long, global = true)]
    pub server: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// サーバーの生存確認
    Status {
        /// 一定間隔で確認を続ける
        #[arg(short, long)]
        watch: bool,
    },

    /// ログイン（パスワードは対話入力）
    Login {
        username: String,
    },

    /// ユーザー登録してログイン
    Register {
        username: String,
    },

    Logout,

    /// ログイン中のユーザーを表示
    Whoami,

    /// 画像の物体を数えて結果を保存
    Count {
        /// 画像ファイルまたはフォルダ
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 選択点 x,y[,+|-]（全画像に適用、省略時は対話入力）
        #[arg(short, long = "point")]
        points: Vec<PointArg>,

        /// リーダー（見本の物体）を選んで数える
        #[arg(long)]
        leaders: bool,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// 保存済みの結果
    Results {
        #[command(subcommand)]
        action: ResultsAction,
    },

    /// データセット
    Datasets {
        #[command(subcommand)]
        action: DatasetsAction,
    },

    /// 画像群をデータセットと比較
    Compare {
        dataset_id: u64,

        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(short, long = "point")]
        points: Vec<PointArg>,

        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// 比較履歴
    Comparisons {
        #[command(subcommand)]
        action: ComparisonsAction,
    },

    /// 表示設定・サーバーアドレス
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
pub enum ResultsAction {
    List,
    Show {
        id: u64,
    },
    Delete {
        id: u64,
    },
    /// 分類名を変更
    Rename {
        id: u64,
        from: String,
        to: String,
    },
}

#[derive(Subcommand)]
pub enum DatasetsAction {
    List,
    /// 分類ごとの物体数を表示
    Show {
        id: u64,
    },
    /// 画像からデータセットを作成（リーダーと分類名は対話入力）
    Create {
        name: String,

        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(short, long = "point")]
        points: Vec<PointArg>,

        #[arg(short = 'r', long)]
        recursive: bool,
    },
    Rename {
        id: u64,
        name: String,
    },
    Delete {
        id: u64,
    },
}

#[derive(Subcommand)]
pub enum ComparisonsAction {
    List,
    Delete {
        id: u64,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    Show,
    /// テーマ (light/dark)
    Theme {
        theme: ThemeArg,
    },
    /// 結果表示の項目の表示/非表示 (certainty/label/ids)
    Display {
        item: DisplayItem,
        #[arg(action = clap::ArgAction::Set)]
        visible: bool,
    },
    /// サーバーアドレスを保存
    Server {
        address: String,

        #[arg(long)]
        https: bool,
    },
    /// 保存したサーバーアドレスを消す
    ResetServer,
}

/// 選択点の指定 `x,y[,+|-]`（省略時は前景）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointArg {
    pub x: f64,
    pub y: f64,
    pub positive: bool,
}

impl std::str::FromStr for PointArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let coordinate = |value: &str| {
            value
                .parse::<f64>()
                .map_err(|_| format!("Invalid coordinate: {}. Use x,y[,+|-]", value))
        };

        let positive = match parts.get(2).copied() {
            None | Some("+") => true,
            Some("-") => false,
            Some(other) => return Err(format!("Unknown polarity: {}. Use + or -", other)),
        };
        if parts.len() < 2 || parts.len() > 3 {
            return Err(format!("Invalid point: {}. Use x,y[,+|-]", s));
        }

        Ok(PointArg {
            x: coordinate(parts[0])?,
            y: coordinate(parts[1])?,
            positive,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ThemeArg {
    Light,
    Dark,
}

impl std::str::FromStr for ThemeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(ThemeArg::Light),
            "dark" => Ok(ThemeArg::Dark),
            _ => Err(format!("Unknown theme: {}. Use light or dark", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DisplayItem {
    Certainty,
    Label,
    Ids,
}

impl std::str::FromStr for DisplayItem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "certainty" => Ok(DisplayItem::Certainty),
            "label" => Ok(DisplayItem::Label),
            "ids" | "id" => Ok(DisplayItem::Ids),
            _ => Err(format!("Unknown item: {}. Use certainty, label, or ids", s)),
        }
    }
}
