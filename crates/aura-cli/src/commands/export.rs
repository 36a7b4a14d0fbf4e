use serde_json::json;

use super::{open_app, CmdResult, Output};

pub fn run(out: Output) -> CmdResult {
    let app = open_app()?;
    match app.export_all() {
        Ok(message) => out.emit(&json!({ "ok": true, "message": message }), &message),
        Err(message) => {
            if out.json {
                println!("{}", json!({ "ok": false, "message": message }));
            } else {
                eprintln!("{message}");
            }
            std::process::exit(1);
        }
    }
}
