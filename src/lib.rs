pub mod config;
mod error;
pub mod interceptor;
pub mod job;
pub mod listener;
pub mod lock;
pub mod message;
pub mod store;
mod template;

pub use config::{MqConfig, RedeliveryConfig};
pub use error::{HandlerError, HandlerResult, MqError};
pub use interceptor::{Interceptor, InterceptorError, LogInterceptor, MessageContext};
pub use job::{
    JobStats, PendingRedeliveryJob, RedeliveryJobThread, Schedule, SweepOutcome, SweepReport,
};
pub use listener::{
    ChannelConsumer, ChannelListener, ChannelListenerContainer, ContainerHandle, ContainerStats,
    StreamConsumer, StreamListener, StreamListenerContainer,
};
pub use message::{
    Broadcast, ChannelMessage, EncodeError, Envelope, Headers, Message, StreamMessage, Streaming,
};
pub use template::MqTemplate;
