//! The bot's periodic tasks.

pub mod announcements;
pub mod dosbox;
pub mod ladderinfo;
pub mod webcam;
pub mod winampnp;

use zergling_stream::StreamInterface;

use crate::engine::TaskDescriptor;

/// The task table. Tasks that drive OBS or read the ladder are only
/// included when the interface has the collaborators they need.
pub fn builtin(stream: &StreamInterface) -> Vec<TaskDescriptor> {
    let mut tasks = vec![
        TaskDescriptor::new(announcements::NAME, announcements::DELAY_MS, announcements::Announcements::new()),
        TaskDescriptor::new(winampnp::NAME, winampnp::DELAY_MS, winampnp::WinampNp::new()),
    ];
    if stream.ladder().is_some() {
        tasks.push(TaskDescriptor::new(ladderinfo::NAME, ladderinfo::DELAY_MS, ladderinfo::LadderInfo::new()));
    }
    if stream.obs().is_some() {
        tasks.push(TaskDescriptor::new(webcam::NAME, webcam::DELAY_MS, webcam::Webcam::new()));
        if stream.processes().is_some() {
            tasks.push(TaskDescriptor::new(dosbox::NAME, dosbox::DELAY_MS, dosbox::Dosbox::new()));
        }
    }
    tasks
}
