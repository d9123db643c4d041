use diagcat::diag::CRC_CCITT;
use diagcat::hdlc::hdlc_encapsulate;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(args: &[&str], path: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_diagcat-decode"))
        .arg("-p")
        .arg(path)
        .args(args)
        .output()
        .expect("Failed to execute diagcat-decode")
}

fn mm_state_log() -> Vec<u8> {
    let body = [1u8, 2, 0, 0, 0, 0, 0, 0];
    let len = (body.len() + 12) as u16;
    let mut frame = vec![0x10, 0];
    frame.extend(len.to_le_bytes());
    frame.extend(len.to_le_bytes());
    frame.extend(0x7131u16.to_le_bytes());
    frame.extend((800u64 << 16).to_le_bytes());
    frame.extend(body);
    frame
}

fn rrc_state_event() -> Vec<u8> {
    let word: u16 = 1606 | (1 << 13);
    let mut events = word.to_le_bytes().to_vec();
    events.extend((800u64 << 16).to_le_bytes());
    events.push(4);
    let mut frame = vec![0x60];
    frame.extend((events.len() as u16).to_le_bytes());
    frame.extend(events);
    frame
}

fn write_capture(dir: &Path) {
    let mut qmdl = hdlc_encapsulate(&mm_state_log(), &CRC_CCITT);
    qmdl.extend(hdlc_encapsulate(&rrc_state_event(), &CRC_CCITT));
    std::fs::write(dir.join("capture.qmdl"), qmdl).unwrap();
}

#[test]
fn test_cli_help_lists_formats() {
    let output = Command::new(env!("CARGO_BIN_EXE_diagcat-decode"))
        .arg("--help")
        .output()
        .expect("Failed to execute diagcat-decode");

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("--format"));
    assert!(stdout.contains("text"));
    assert!(stdout.contains("json"));
    assert!(stdout.contains("pcap"));
    assert!(stdout.contains("--disable-crc-check"));
}

#[test]
fn test_cli_empty_directory_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["--format", "json", "--quiet"], temp_dir.path());
    assert!(output.status.success());
}

#[test]
fn test_cli_rejects_invalid_format() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(&["--format", "invalid"], temp_dir.path());
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("invalid"));
}

#[test]
fn test_cli_json_output() {
    let temp_dir = TempDir::new().unwrap();
    write_capture(temp_dir.path());
    let output = run(&["--format", "json", "--quiet"], temp_dir.path());
    assert!(output.status.success());

    let ndjson = std::fs::read_to_string(temp_dir.path().join("capture.ndjson")).unwrap();
    let lines: Vec<serde_json::Value> = ndjson
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["kind"], "nas_message");
    assert_eq!(lines[0]["fields"]["mm_state"], "MM_CONNECTION_ACTIVE");
    assert_eq!(lines[1]["kind"], "event");
    assert_eq!(lines[1]["fields"]["type"], "LTE_RRC_STATE_CHANGE");
    assert_eq!(lines[2]["packets"], 2);
    assert_eq!(lines[2]["by_kind"]["event"], 1);
}

#[test]
fn test_cli_text_output_without_events() {
    let temp_dir = TempDir::new().unwrap();
    write_capture(temp_dir.path());
    let output = run(&["--no-events", "--quiet"], temp_dir.path());
    assert!(output.status.success());

    let text = std::fs::read_to_string(temp_dir.path().join("capture.txt")).unwrap();
    assert!(text.starts_with("%MOBILE PARSED MESSAGE FILE\n"));
    assert!(text.contains("%LOG FILE NAME  : capture.txt"));
    assert!(text.contains("0x7131  UMTS NAS_MM State"));
    assert!(text.contains("MM State = MM_CONNECTION_ACTIVE"));
    assert!(!text.contains("0x1FFB  Event"));
}

#[test]
fn test_cli_config_file_selects_pcap() {
    let temp_dir = TempDir::new().unwrap();
    write_capture(temp_dir.path());
    let config_path = temp_dir.path().join("diagcat.toml");
    std::fs::write(&config_path, "mode = \"network\"\nradio_id = 1\n").unwrap();

    let output = run(
        &["--config", config_path.to_str().unwrap(), "--quiet"],
        temp_dir.path(),
    );
    assert!(output.status.success());

    let pcap = std::fs::read(temp_dir.path().join("capture.pcapng")).unwrap();
    // section header block
    assert_eq!(&pcap[..4], &[0x0a, 0x0d, 0x0d, 0x0a]);
    let needle = b"LTE_RRC_STATE_CHANGE: rrc_state=RRC_CONNECTED";
    assert!(pcap.windows(needle.len()).any(|w| w == needle));
}

#[test]
fn test_cli_bad_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("diagcat.toml");
    std::fs::write(&config_path, "mode = 3\n").unwrap();
    let output = run(
        &["--config", config_path.to_str().unwrap(), "--quiet"],
        temp_dir.path(),
    );
    assert!(!output.status.success());
}
