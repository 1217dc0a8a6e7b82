use super::script::{Instruction, Script};

/// Human name for a virtual key code.
pub fn key_label(code: u32) -> String {
    match code {
        0x08 => "Backspace".to_string(),
        0x09 => "Tab".to_string(),
        0x0A => "Enter".to_string(),
        0x10 => "Shift".to_string(),
        0x11 => "Ctrl".to_string(),
        0x12 => "Alt".to_string(),
        0x1B => "Escape".to_string(),
        0x20 => "Space".to_string(),
        0x25 => "Left".to_string(),
        0x26 => "Up".to_string(),
        0x27 => "Right".to_string(),
        0x28 => "Down".to_string(),
        0x7F => "Delete".to_string(),
        0x30..=0x39 | 0x41..=0x5A => char::from_u32(code)
            .map(String::from)
            .unwrap_or_default(),
        0x70..=0x7B => format!("F{}", code - 0x6F),
        _ => format!("0x{code:X}"),
    }
}

/// Render a script as one instruction per line. Key instructions carry the
/// key name as a trailing comment.
pub fn generate_content(title: &str, script: &Script) -> String {
    let count = script.instructions.len();
    let plural = if count == 1 { "" } else { "s" };
    let mut out = format!(
        "# {title} ({count} instruction{plural}, {} ms)\n",
        script.duration_ms()
    );
    out.push_str(&format!("# mode: {:?}\n", script.mode));

    for instruction in script.iter() {
        out.push_str(&instruction.to_string());
        if let Instruction::Key { code, .. } = instruction {
            out.push_str(&format!(" # {}", key_label(*code)));
        }
        out.push('\n');
    }

    out
}
