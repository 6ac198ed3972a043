//! The batch update operator and the stages an invocation goes through:
//! bind, group, plan, dispatch, reassemble and coerce.

pub mod batch_update;
pub mod binder;
pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod grouper;
pub mod interceptor;
pub mod reassembler;
pub mod return_shape;
pub mod spec;

pub use batch_update::{BatchUpdateOperator, BatchUpdateOperatorBuilder, DispatchPlan};
pub use binder::{RowBinder, RowBinding};
pub use config::OperatorConfig;
pub use descriptor::{OperatorDescriptor, OperatorDescriptorBuilder};
pub use dispatcher::{CallShape, ExecutionDispatcher, PlannedCall};
pub use grouper::ShardGroup;
pub use interceptor::{BatchInterceptor, InterceptorChain};
pub use return_shape::{BatchOutput, RETURN_SHAPE_WHITELIST, ReturnShape};
pub use spec::{OperatorSpec, ShardingSpec};
