use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join("bursar.db");

    println!("School:     {}", if settings.school_name.is_empty() { "(not set)" } else { &settings.school_name });
    println!("School ID:  {}", if settings.school_id.is_empty() { "(not set)" } else { &settings.school_id });
    println!("Year start: month {}", settings.session_start_month);
    println!("Session:    {}", settings.current_session.as_deref().unwrap_or("(follows today)"));
    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        let students: i64 = conn.query_row("SELECT count(*) FROM students", [], |r| r.get(0))?;
        let vehicles: i64 = conn.query_row("SELECT count(*) FROM vehicles", [], |r| r.get(0))?;
        let schedule: i64 = conn.query_row("SELECT count(*) FROM fee_schedule", [], |r| r.get(0))?;
        let deposits: i64 = conn.query_row(
            "SELECT count(*) FROM deposits WHERE status = 'paid'",
            [],
            |r| r.get(0),
        )?;

        println!();
        println!("Students:      {students}");
        println!("Vehicles:      {vehicles}");
        println!("Fee entries:   {schedule}");
        println!("Paid months:   {deposits}");
    } else {
        println!();
        println!("Database not found. Run `bursar init` to set up.");
    }

    Ok(())
}
