pub mod in_memory_event_bus;
pub mod redis_event_publisher;

pub use in_memory_event_bus::InMemoryEventBus;
pub use redis_event_publisher::RedisEventPublisher;
