//! `scaffold add job-queue`

use super::Session;
use crate::errors::CommandError;
use crate::naming;
use crate::result::CommandResult;
use clap::Args;
use scaffold_ast::edit::add_import;
use scaffold_ast::edit::members::{add_implements, append_to_method_body};
use scaffold_ast::edit::ImportSpec;
use scaffold_ast::{syntax, AstError, Injection, PluginRef, Project, ServiceRef};
use scaffold_logger as logger;

#[derive(Args, Debug, Clone, Default)]
pub struct AddJobQueueOptions {
    /// Plugin whose service gets the queue
    #[arg(long)]
    pub plugin: Option<String>,

    /// Service to add the queue to
    #[arg(long)]
    pub service: Option<String>,

    /// Queue name in kebab-case, e.g. re-index
    #[arg(long)]
    pub name: Option<String>,
}

pub fn run(session: &mut Session, options: &AddJobQueueOptions) -> Result<CommandResult, CommandError> {
    let plugin: PluginRef = session.select_plugin(options.plugin.clone())?;
    let service = session.select_service(&plugin, options.service.clone())?;
    let name = session.text(
        options.name.clone(),
        "What is the name of the job queue?",
        naming::validate_kebab_name,
        ("Job queue name is required", "Pass --name <queue-name>"),
    )?;

    logger::step(&format!("Adding job queue {name} to {}", service.class_name()));
    let queue = add_job_queue(&mut session.project, &service, &name)?;
    session.finish(
        CommandResult::ok(format!("Added job queue {name} to {}", service.class_name()))
            .with("queue", name.as_str())
            .with("property", queue.property.as_str())
            .with("trigger", queue.trigger.as_str()),
        &[],
    )
}

/// Names generated for one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQueueNames {
    pub property: String,
    pub trigger: String,
}

impl JobQueueNames {
    pub fn new(queue: &str) -> Self {
        Self {
            property: format!("{}Queue", naming::camel(queue)),
            trigger: format!("trigger{}", naming::pascal(queue)),
        }
    }
}

pub fn add_job_queue(
    project: &mut Project,
    service: &ServiceRef,
    queue: &str,
) -> Result<JobQueueNames, CommandError> {
    let names = JobQueueNames::new(queue);
    let class = project.class_node(service.handle())?;
    if syntax::find_property(&class, &names.property).is_some() {
        return Err(CommandError::validation(
            format!("{} already has a property {}", service.class_name(), names.property),
            "Choose a different queue name",
        ));
    }
    if syntax::find_method(&class, &names.trigger).is_some() {
        return Err(CommandError::validation(
            format!("{} already has a method {}", service.class_name(), names.trigger),
            "Choose a different queue name",
        ));
    }

    add_import(
        project,
        service.path(),
        &ImportSpec::from_package(
            "@vendure/core",
            &["JobQueue", "JobQueueService", "RequestContext", "SerializedRequestContext"],
        ),
    )?;
    add_import(
        project,
        service.path(),
        &ImportSpec::from_package("@nestjs/common", &["OnModuleInit"]),
    )?;
    service.edit(project, |view, class| add_implements(view, class, "OnModuleInit"))?;

    service.add_property(
        project,
        &names.property,
        &format!(
            "private {}: JobQueue<{{ ctx: SerializedRequestContext; someArg: string }}>;",
            names.property
        ),
    )?;
    service.inject_dependency(project, &Injection::new("jobQueueService", "JobQueueService"))?;

    let create_queue = format!(
        "this.{property} = await this.jobQueueService.createQueue({{
    name: '{queue}',
    process: async job => {{
        // Deserialize the RequestContext from the job data
        const ctx = RequestContext.deserialize(job.data.ctx);
        // The \"someArg\" property is passed in when the job is triggered
        const someArg = job.data.someArg;

        // Use the data to perform some long-running task
        await new Promise(resolve => setTimeout(resolve, 10000));

        return {{ result: `${{someArg}} processed` }};
    }},
}});",
        property = names.property,
    );
    if service.has_method(project, "onModuleInit") {
        service.edit(project, |view, class| {
            let method = syntax::find_method(class, "onModuleInit").ok_or_else(|| {
                AstError::MethodNotFound {
                    class: service.class_name().to_string(),
                    method: "onModuleInit".to_string(),
                }
            })?;
            append_to_method_body(view, &method, &create_queue)
        })?;
    } else {
        let body = syntax::reindent(&create_queue, &project.settings().indent);
        service.add_method(
            project,
            "onModuleInit",
            &format!("async onModuleInit() {{\n{body}\n}}"),
        )?;
    }

    service.add_method(
        project,
        &names.trigger,
        &format!(
            "{trigger}(ctx: RequestContext) {{
    return this.{property}.add({{
        ctx: ctx.serialize(),
        someArg: 'foo',
    }});
}}",
            trigger = names.trigger,
            property = names.property,
        ),
    )?;
    Ok(names)
}
