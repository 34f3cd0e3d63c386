use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::months::{validate_session, AcademicYear};
use crate::settings::{load_settings, save_settings, shellexpand_path, Settings};

pub fn run(
    data_dir: Option<String>,
    school_id: Option<String>,
    school_name: Option<String>,
    session_start: Option<String>,
    session: Option<String>,
) -> Result<()> {
    let mut settings = load_settings();
    let defaults = Settings::default();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    } else if settings.data_dir == defaults.data_dir && settings.school_id.is_empty() {
        // First run: prompt for data dir
        let default = &settings.data_dir;
        println!("Data directory [{}]: ", default);
        let mut input = String::new();
        std::io::stdin().read_line(&mut input).ok();
        let chosen = input.trim();
        if !chosen.is_empty() {
            settings.data_dir = shellexpand_path(chosen);
        }
    }

    if let Some(id) = school_id {
        settings.school_id = id;
    }
    if settings.school_id.is_empty() {
        settings.school_id = "main".to_string();
    }
    if let Some(name) = school_name {
        settings.school_name = name;
    }
    if let Some(start) = session_start {
        AcademicYear::from_setting(&start)?;
        settings.session_start_month = format!("{:0>2}", start.trim());
    }
    if let Some(s) = session {
        validate_session(&s)?;
        settings.current_session = Some(s);
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(resolved.join("exports"))?;

    let conn = get_connection(&resolved.join("bursar.db"))?;
    init_db(&conn)?;

    println!("Initialized bursar at {}", resolved.display());
    Ok(())
}
