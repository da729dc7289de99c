pub mod labels;
pub mod normalize;
pub mod patch;
pub mod project;
pub mod task;

pub use normalize::{ProjectJoin, TaskRow, normalize_task, normalize_tasks};
pub use patch::TaskPatch;
pub use project::{NewProjectRequest, Project, RenameProjectRequest};
pub use task::{
    NewTask, NewTaskRequest, Priority, Task, TaskDraft, TaskStatus, TaskType, WorkDays,
};
