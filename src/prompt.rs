//! 対話入力
//!
//! 選択点・リーダー・名前・パスワードを端末から受け取る。
//! 入力文字列の解釈は端末に依存しない関数に分けてある。

use crate::cli::PointArg;
use crate::error::{ClientError, Result};
use dialoguer::{Confirm, Input, Password};

/// 選択点入力の1行分
#[derive(Debug, Clone, PartialEq)]
pub enum PointCommand {
    Add(PointArg),
    /// 最後の点を取り消す
    Undo,
    /// 入力を終えて送信
    Done,
    Quit,
    Invalid(String),
}

/// `x,y[,+|-]` / `u` / 空行 / `q` を解釈
pub fn parse_point_command(input: &str) -> PointCommand {
    match input.trim() {
        "" => PointCommand::Done,
        "u" | "U" => PointCommand::Undo,
        "q" | "Q" => PointCommand::Quit,
        other => match other.parse::<PointArg>() {
            Ok(point) => PointCommand::Add(point),
            Err(e) => PointCommand::Invalid(e),
        },
    }
}

/// カンマ/空白区切りの要素IDを読む
pub fn parse_id_list(input: &str) -> std::result::Result<Vec<u64>, String> {
    let mut ids = Vec::new();
    for token in input.split(|c: char| c == ',' || c.is_whitespace()) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let id = token
            .parse::<u64>()
            .map_err(|_| format!("Invalid element id: {}", token))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn prompt_error(e: dialoguer::Error) -> ClientError {
    ClientError::Prompt(e.to_string())
}

/// 選択点を1行読む
pub fn prompt_point(point_count: usize) -> Result<PointCommand> {
    let prompt = if point_count == 0 {
        "選択点 x,y[,+|-] (q:終了)".to_string()
    } else {
        format!("選択点 x,y[,+|-] ({}点、Enter:送信 u:取り消し q:終了)", point_count)
    };

    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_error)?;

    Ok(parse_point_command(&input))
}

/// 背景マスクを受け入れるか
pub fn confirm_selection() -> Result<bool> {
    Confirm::new()
        .with_prompt("この背景で確定しますか（No で選択点の編集に戻る）")
        .default(true)
        .interact()
        .map_err(prompt_error)
}

/// 結果を破棄して選択点からやり直すか
pub fn confirm_restart() -> Result<bool> {
    Confirm::new()
        .with_prompt("結果を破棄して選択点からやり直しますか")
        .default(false)
        .interact()
        .map_err(prompt_error)
}

/// リーダーにする要素IDを読む（空行で確定）
pub fn prompt_leaders(candidates: &[u64]) -> Result<Vec<u64>> {
    if !candidates.is_empty() {
        let joined: Vec<String> = candidates.iter().map(u64::to_string).collect();
        println!("  要素ID: {}", joined.join(", "));
    }

    loop {
        let input: String = Input::new()
            .with_prompt("リーダーの要素ID（カンマ区切り）")
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_error)?;

        match parse_id_list(&input) {
            Ok(ids) => return Ok(ids),
            Err(e) => println!("  {}", e),
        }
    }
}

/// 空でない名前を読む
pub fn prompt_name(prompt: &str) -> Result<String> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .validate_with(|value: &String| -> std::result::Result<(), &str> {
            if value.trim().is_empty() {
                Err("名前を入力してください")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .map_err(prompt_error)?;

    Ok(input.trim().to_string())
}

/// パスワード入力（登録時は確認つき）
pub fn prompt_password(confirm: bool) -> Result<String> {
    let mut password = Password::new().with_prompt("パスワード");
    if confirm {
        password = password.with_confirmation("パスワード（確認）", "パスワードが一致しません");
    }
    password.interact().map_err(prompt_error)
}
