use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use objects_counter::cli::{
    Cli, Commands, ComparisonsAction, DatasetsAction, DisplayItem, PointArg, ResultsAction,
    SettingsAction, ThemeArg,
};
use objects_counter::config::Config;
use objects_counter::controller::{AcceptOutcome, AppController, ClickOutcome, DatasetDraft};
use objects_counter::prompt::{self, PointCommand};
use objects_counter::scanner;
use objects_counter_common::{SettingsState, Theme, Workflow};
use std::path::PathBuf;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = Config::load().context("設定の読み込みに失敗")?;
    let config_dir = Config::config_dir()?;
    let mut controller = AppController::open(config, &config_dir)?;
    if let Some(server) = cli.server.as_deref() {
        controller.override_server(server);
    }

    // 401でログアウトした場合もCookieを書き出す
    let outcome = run(&mut controller, cli.command).await;
    controller
        .persist()
        .with_context(|| format!("{} への保存に失敗", config_dir.display()))?;
    outcome
}

async fn run(controller: &mut AppController, command: Commands) -> Result<()> {
    match command {
        Commands::Status { watch } => {
            let delay = Duration::from_millis(controller.config().is_alive_delay_ms);
            loop {
                let status = controller.check_server_status().await;
                println!(
                    "[{}] {} : {:?}",
                    Local::now().format("%H:%M:%S"),
                    controller.api().request().base_uri(),
                    status
                );
                if !watch {
                    break;
                }
                tokio::time::sleep(delay).await;
            }
        }

        Commands::Login { username } => {
            let password = prompt::prompt_password(false)?;
            controller.login(&username, &password).await?;
            println!("✔ {} としてログインしました", controller.context().user.username());
        }

        Commands::Register { username } => {
            let password = prompt::prompt_password(true)?;
            controller.register(&username, &password).await?;
            println!("✔ {} を登録してログインしました", controller.context().user.username());
        }

        Commands::Logout => {
            controller.logout();
            println!("✔ ログアウトしました");
        }

        Commands::Whoami => {
            let user = &controller.context().user;
            if user.is_logged_in() {
                println!("{} (id {})", user.username(), user.user_id());
            } else {
                println!("{} (未ログイン)", user.username());
            }
        }

        Commands::Count { paths, points, leaders, recursive } => {
            println!("🔢 objects-counter - 物体カウント\n");
            let workflow = if leaders { Workflow::LeaderCounting } else { Workflow::AutomaticCounting };
            if !run_selection(controller, workflow, &paths, &points, recursive).await? {
                return Ok(());
            }

            loop {
                if leaders {
                    println!("\n[3/3] リーダーを選択");
                    select_leaders(controller)?;
                    controller.submit_leaders(None).await?;
                }
                print_counting_result(controller);

                if !points.is_empty() || !prompt::confirm_restart()? {
                    break;
                }
                controller.discard_result()?;
                if !select_backgrounds(controller, &points).await? {
                    return Ok(());
                }
            }
        }

        Commands::Results { action } => run_results(controller, action).await?,
        Commands::Datasets { action } => run_datasets(controller, action).await?,

        Commands::Compare { dataset_id, paths, points, recursive } => {
            println!("⚖ objects-counter - データセットと比較\n");
            if !run_selection(controller, Workflow::CompareWithDataset, &paths, &points, recursive).await? {
                return Ok(());
            }

            println!("\n[3/3] データセット {} と比較中...", dataset_id);
            controller.compare_with_dataset(dataset_id).await?;
            print_comparison(controller);
        }

        Commands::Comparisons { action } => match action {
            ComparisonsAction::List => {
                let items = controller.browse_comparisons().await?;
                if items.is_empty() {
                    println!("比較履歴はありません");
                }
                for item in items {
                    let dataset = item
                        .dataset_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".into());
                    println!(
                        "#{:<5} {}  データセット {}  画像 {}枚  分類 {}",
                        item.id,
                        format_timestamp(item.timestamp),
                        dataset,
                        item.image_count,
                        item.classification_count
                    );
                }
            }
            ComparisonsAction::Delete { id } => {
                controller.delete_comparison(id).await?;
                println!("✔ 比較 {} を削除しました", id);
            }
        },

        Commands::Settings { action } => run_settings(controller, action),
    }

    Ok(())
}

// =============================================
// 選択点の編集
// =============================================

/// アップロードから背景の確定までを画像ごとに繰り返す
///
/// 途中で終了した場合は false
async fn run_selection(
    controller: &mut AppController,
    workflow: Workflow,
    paths: &[PathBuf],
    points: &[PointArg],
    recursive: bool,
) -> Result<bool> {
    let images = scanner::collect_images(paths, recursive)?;
    println!("[1/3] {}枚の画像をアップロード中...", images.len());
    controller.start_workflow(workflow);
    let count = controller.upload_images(&images).await?;
    println!("✔ {}枚アップロード完了\n", count);

    select_backgrounds(controller, points).await
}

/// 画像ごとに選択点を置いて背景を確定する
///
/// 途中で終了した場合は false
async fn select_backgrounds(controller: &mut AppController, points: &[PointArg]) -> Result<bool> {
    println!("[2/3] 背景の選択");
    loop {
        let images = &controller.context().images;
        let index = images.current_image_index();
        if let Some(image) = images.current_image() {
            println!(
                "\n画像 {}/{} (id {}, {}x{})",
                index + 1,
                images.images().len(),
                image.id,
                image.width,
                image.height
            );
        }

        if !edit_points(controller, points)? {
            println!("中断しました");
            return Ok(false);
        }

        controller.send_selection().await?;
        if points.is_empty() && !prompt::confirm_selection()? {
            controller.reject_selection()?;
            continue;
        }

        match controller.accept_selection().await? {
            AcceptOutcome::NextImage(_) => continue,
            AcceptOutcome::Finished(_) => return Ok(true),
        }
    }
}

/// 選択点を置く（引数の点があればそれを使い、なければ対話入力）
fn edit_points(controller: &mut AppController, points: &[PointArg]) -> Result<bool> {
    if !points.is_empty() {
        if controller.context().images.points().is_empty() {
            for point in points {
                controller.place_point(point.positive, point.x, point.y);
            }
        }
        return Ok(true);
    }

    loop {
        let placed = controller.context().images.points().len();
        match prompt::prompt_point(placed)? {
            PointCommand::Add(point) => {
                if let ClickOutcome::Added(added) = controller.place_point(point.positive, point.x, point.y) {
                    let polarity = if added.positive { "+" } else { "-" };
                    println!("  {} ({}, {})", polarity, added.position[0], added.position[1]);
                }
            }
            PointCommand::Undo => {
                if controller.undo_point() == ClickOutcome::Ignored {
                    println!("  取り消す点がありません");
                }
            }
            PointCommand::Done if placed == 0 => println!("  点を1つ以上置いてください"),
            PointCommand::Done => return Ok(true),
            PointCommand::Quit => return Ok(false),
            PointCommand::Invalid(message) => println!("  {}", message),
        }
    }
}

/// 画像ごとにリーダーを選ぶ
fn select_leaders(controller: &mut AppController) -> Result<()> {
    let image_count = controller.context().images.images().len();
    for index in 0..image_count {
        controller.select_image(index);
        let candidates: Vec<u64> = controller
            .context()
            .images
            .current_image()
            .map(|image| image.elements.iter().map(|element| element.id).collect())
            .unwrap_or_default();
        println!("\n画像 {}/{}", index + 1, image_count);

        for element_id in prompt::prompt_leaders(&candidates)? {
            if let Err(e) = controller.toggle_leader(element_id) {
                println!("  {}", e);
            }
        }
    }
    Ok(())
}

// =============================================
// 結果・データセット
// =============================================

async fn run_results(controller: &mut AppController, action: ResultsAction) -> Result<()> {
    match action {
        ResultsAction::List => {
            let items = controller.browse_results().await?;
            if items.is_empty() {
                println!("保存済みの結果はありません");
            }
            for item in items {
                println!(
                    "#{:<5} {}  画像 {}  分類 {}  物体 {}",
                    item.id,
                    format_timestamp(item.timestamp),
                    item.image_id,
                    item.classification_count,
                    item.element_count
                );
            }
        }
        ResultsAction::Show { id } => {
            controller.open_result(id).await?;
            print_counting_result(controller);
        }
        ResultsAction::Delete { id } => {
            controller.delete_result(id).await?;
            println!("✔ 結果 {} を削除しました", id);
        }
        ResultsAction::Rename { id, from, to } => {
            controller.open_result(id).await?;
            controller.rename_classification(&from, &to).await?;
            println!("✔ {} → {}", from, to);
            print_counting_result(controller);
        }
    }
    Ok(())
}

async fn run_datasets(controller: &mut AppController, action: DatasetsAction) -> Result<()> {
    match action {
        DatasetsAction::List => {
            let items = controller.browse_datasets().await?;
            if items.is_empty() {
                println!("データセットはありません");
            }
            for item in items {
                let status = if item.unfinished { " (未完成)" } else { "" };
                println!(
                    "#{:<5} {}{}  {}  画像 {}枚",
                    item.id,
                    item.name,
                    status,
                    format_timestamp(item.timestamp),
                    item.image_count
                );
            }
        }
        DatasetsAction::Show { id } => {
            let classifications = controller.preview_dataset(id).await?;
            println!("データセット {}", id);
            for item in classifications {
                println!("  {:<20} {}", item.name, item.count);
            }
        }
        DatasetsAction::Create { name, paths, points, recursive } => {
            println!("🗂 objects-counter - データセット作成\n");
            if !run_selection(controller, Workflow::CreateDataset, &paths, &points, recursive).await? {
                return Ok(());
            }

            println!("\n[3/3] リーダーと分類名を選択");
            select_leaders(controller)?;
            let mut draft = DatasetDraft {
                name,
                ..Default::default()
            };
            for leader_id in controller.context().images.all_leader_ids() {
                let label = prompt::prompt_name(&format!("要素 {} の分類名", leader_id))?;
                draft.leader_names.insert(leader_id, label);
            }

            controller.submit_leaders(Some(&draft)).await?;
            if let Some(dataset_id) = controller.context().images.dataset_id() {
                println!("\n✅ データセット {} を作成しました", dataset_id);
            }
            print_counting_result(controller);
        }
        DatasetsAction::Rename { id, name } => {
            controller.browse_datasets().await?;
            controller.rename_dataset(id, &name).await?;
            println!("✔ データセット {} の名前を変更しました", id);
        }
        DatasetsAction::Delete { id } => {
            controller.delete_dataset(id).await?;
            println!("✔ データセット {} を削除しました", id);
        }
    }
    Ok(())
}

fn run_settings(controller: &mut AppController, action: SettingsAction) {
    match action {
        SettingsAction::Show => {
            let settings = &controller.context().settings;
            let saved = SettingsState::saved_server_address(controller.local_storage());
            println!("設定:");
            println!("  テーマ: {:?}", settings.theme());
            println!("  確信度の表示: {}", settings.show_box_certainty);
            println!("  ラベルの表示: {}", settings.show_box_label);
            println!("  要素IDの表示: {}", settings.show_element_ids);
            println!("  サーバー: {}", controller.config().server_uri());
            println!(
                "  保存済みアドレス: {}",
                saved.address.as_deref().unwrap_or("なし")
            );
        }
        SettingsAction::Theme { theme } => {
            let theme = match theme {
                ThemeArg::Light => Theme::Light,
                ThemeArg::Dark => Theme::Dark,
            };
            controller.set_theme(theme);
            println!("✔ テーマ: {:?}", theme);
        }
        SettingsAction::Display { item, visible } => {
            match item {
                DisplayItem::Certainty => controller.update_box_certainty_visibility(visible),
                DisplayItem::Label => controller.update_box_label_visibility(visible),
                DisplayItem::Ids => controller.update_element_ids_visibility(visible),
            }
            println!("✔ {:?}: {}", item, visible);
        }
        SettingsAction::Server { address, https } => {
            controller.save_server_address(&address, https);
            println!("✔ サーバー: {}", controller.config().server_uri());
        }
        SettingsAction::ResetServer => {
            controller.reset_server_address();
            println!("✔ サーバー: {}", controller.config().server_uri());
        }
    }
}

// =============================================
// 表示
// =============================================

fn print_counting_result(controller: &AppController) {
    let context = controller.context();
    let images = &context.images;
    println!("\n{}", context.view.nav_title());
    if let Some(result_id) = images.result_id() {
        println!("  結果ID: {}", result_id);
    }

    let summary = images.classification_summary();
    if summary.is_empty() {
        println!("  物体は見つかりませんでした");
    }
    for item in &summary {
        println!("  {:<20} {}", item.name, item.count);
    }

    if context.settings.show_element_ids {
        for element in images.all_elements() {
            let label = element
                .classification
                .as_deref()
                .and_then(|name| images.display_name(name).or(Some(name)))
                .unwrap_or("-");
            let mut line = format!("    #{} {}", element.id, label);
            if context.settings.show_box_certainty {
                if let Some(certainty) = element.certainty {
                    line.push_str(&format!(" ({:.0}%)", certainty * 100.0));
                }
            }
            if element.is_leader {
                line.push_str(" ★");
            }
            println!("{}", line);
        }
    }
}

fn print_comparison(controller: &AppController) {
    let images = &controller.context().images;
    println!("\n比較結果（データセット {}）", images.dataset_id().unwrap_or_default());
    let diff = images.comparison_diff();
    if diff.is_empty() {
        println!("  差はありません");
    }
    for (name, delta) in diff {
        println!("  {:<20} {:+}", name, delta);
    }
}

fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into())
}
