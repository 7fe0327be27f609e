use crate::studio::notice::Notice;

#[derive(Clone, Debug)]
pub(crate) struct FlashMessage {
    pub(crate) text: String,
    pub(crate) class: &'static str,
}

impl From<&Notice> for FlashMessage {
    fn from(notice: &Notice) -> Self {
        Self {
            text: notice.text(),
            class: notice.class(),
        }
    }
}

/// Turns queued notices into banners, oldest first.
pub(crate) fn flash_messages(notices: &[Notice]) -> Vec<FlashMessage> {
    notices.iter().map(FlashMessage::from).collect()
}
