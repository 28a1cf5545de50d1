use roster_types::*;

const HEADERS: [&str; 6] = ["ID", "FIRST NAME", "CITY", "PHONE", "HEIGHT", "MARRIED"];

pub fn format_user_response(result: &UserResponse) -> String {
    format_users(std::slice::from_ref(&result.user))
}

pub fn format_users_response(result: &UsersResponse) -> String {
    if result.users.is_empty() {
        return "No users found".to_string();
    }
    let mut out = format_users(&result.users);
    if result.users.len() > 1 {
        out.push_str(&format!("\n\n{} users", result.users.len()));
    }
    out
}

pub fn format_describe_session(result: &DescribeSessionResult) -> String {
    [
        format!("Daemon PID: {}", result.daemon_pid),
        format!("Listening on: {}", result.listen_addr),
        format!("Users stored: {}", result.user_count),
    ]
    .join("\n")
}

pub fn format_status(status: &Status) -> String {
    format!("Error ({}): {}", status.code, status.message)
}

fn user_row(user: &User) -> [String; 6] {
    [
        user.id.to_string(),
        user.fname.clone(),
        user.city.clone(),
        user.phone.to_string(),
        format!("{:.1}", user.height),
        if user.married { "yes" } else { "no" }.to_string(),
    ]
}

fn format_users(users: &[User]) -> String {
    let rows: Vec<[String; 6]> = users.iter().map(user_row).collect();

    let mut widths = HEADERS.map(|h| h.len());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    let mut lines = vec![render(&header[..])];
    lines.extend(rows.iter().map(|row| render(&row[..])));
    lines.join("\n")
}

pub fn format_profiling(data: &ProfilingData) -> String {
    let summary = format!("{} took {}", data.method, format_duration_us(data.total_us));
    if data.functions.is_empty() {
        return format!("{}\nNo profiling data", summary);
    }

    let header = format!(
        "{:<32} {:>6} {:>10} {:>10} {:>10} {:>10}",
        "FUNCTION", "CALLS", "TOTAL", "AVG", "P90", "MAX"
    );
    let mut lines = vec![summary, header];
    for f in &data.functions {
        lines.push(format!(
            "{:<32} {:>6} {:>10} {:>10} {:>10} {:>10}",
            f.name,
            f.calls,
            format_duration_us(f.total_us),
            format_duration_us(f.avg_us),
            format_duration_us(f.p90_us),
            format_duration_us(f.max_us),
        ));
    }
    lines.join("\n")
}

fn format_duration_us(us: u64) -> String {
    if us >= 1_000_000 {
        format!("{:.2}s", us as f64 / 1_000_000.0)
    } else if us >= 1000 {
        format!("{:.2}ms", us as f64 / 1000.0)
    } else {
        format!("{}µs", us)
    }
}
