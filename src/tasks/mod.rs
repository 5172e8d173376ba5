pub(crate) mod answer_sync;
pub(crate) mod countdown;
