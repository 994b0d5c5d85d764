use nova_render::nova::Error;
use super::*;

const SOURCE: &str = "nova::soft::Test";

fn discard(target: AttachmentHandle) -> DeviceCommand {
    DeviceCommand::Discard { target }
}

#[test]
fn test_recording_lifecycle() {
    let mut recorder = CommandRecorder::new();
    assert!(matches!(recorder.push(SOURCE, discard(AttachmentHandle::default())), Err(Error::LogicError(_))));

    recorder.begin(SOURCE).unwrap();
    assert!(matches!(recorder.begin(SOURCE), Err(Error::LogicError(_))));
    recorder.push(SOURCE, discard(AttachmentHandle::default())).unwrap();
    assert_eq!(recorder.len(), 1);
    assert!(matches!(recorder.take(SOURCE), Err(Error::LogicError(_))));

    recorder.end(SOURCE).unwrap();
    assert!(matches!(recorder.end(SOURCE), Err(Error::LogicError(_))));
    assert_eq!(recorder.take(SOURCE).unwrap().len(), 1);
    assert!(recorder.is_empty());
}

#[test]
fn test_begin_clears_previous_recording() {
    let mut recorder = CommandRecorder::new();
    recorder.begin(SOURCE).unwrap();
    recorder.push(SOURCE, discard(AttachmentHandle::default())).unwrap();
    recorder.end(SOURCE).unwrap();

    recorder.begin(SOURCE).unwrap();
    assert!(recorder.commands().is_empty());

    recorder.push(SOURCE, discard(AttachmentHandle::default())).unwrap();
    recorder.discard();
    assert!(!recorder.is_recording());
    assert!(recorder.is_empty());
}

#[test]
fn test_command_names() {
    assert_eq!(discard(AttachmentHandle::default()).name(), "discard");
    let timestamp = DeviceCommand::WriteTimestamp { pool: QueryPoolHandle::default(), index: 3 };
    assert_eq!(timestamp.name(), "write_timestamp");
}
