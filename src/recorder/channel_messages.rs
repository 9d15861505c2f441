use crate::detector::Sample;

pub enum RecorderToWriterChannelMessage {
    Data(Sample),
    EndThread,
}
