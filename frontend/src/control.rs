//! The `control` subcommand: wire an intersection definition, the
//! controller, the field bus and the RPC server together and run until
//! terminated.

use std::rc::Rc;

use atsc_core::core::clock::ClockRates;
use atsc_core::fieldbus::{FieldBus, SerialLink};
use atsc_core::prelude::*;
use tokio::task::LocalSet;
use tracing::{error, info};

use crate::config::DaemonConfig;
use crate::{ControlArgs, ExitCode, config, logging, pid, rpc};

pub fn run(args: ControlArgs) -> ExitCode {
    if let Err(code) = logging::setup(&args.levels, args.log.as_deref()) {
        return code;
    }

    let daemon_config = match config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            error!(error = %message, "configuration failure");
            return ExitCode::BuildFail;
        }
    };

    let Some(entry) = atsc_intersections::find(&args.intersection) else {
        let known: Vec<&str> = atsc_intersections::all().iter().map(|e| e.name).collect();
        error!(
            requested = %args.intersection,
            available = ?known,
            "unknown intersection"
        );
        return ExitCode::BuildFail;
    };

    let pid_file = match &args.pid {
        Some(path) => match pid::PidFile::create(path) {
            Ok(file) => Some(file),
            Err(code) => return code,
        },
        None => {
            info!(pid = std::process::id(), "running without PID file");
            None
        }
    };

    let code = run_daemon(&args, &daemon_config, entry.create);

    match pid_file.map(pid::PidFile::remove) {
        Some(Err(remove_code)) if code == ExitCode::Ok => remove_code,
        _ => code,
    }
}

fn run_daemon(
    args: &ControlArgs,
    daemon_config: &DaemonConfig,
    create: fn() -> IntersectionDef,
) -> ExitCode {
    let rates = ClockRates {
        time_hz: args.tick_rate,
        inputs_hz: daemon_config.rates.inputs_hz.unwrap_or(20.0),
        fieldbus_hz: daemon_config.rates.fieldbus_hz.unwrap_or(20.0),
        network_hz: daemon_config.rates.network_hz.unwrap_or(20.0),
        flash_fpm: daemon_config.rates.flash_fpm.unwrap_or(60.0),
    };
    let options = ControllerOptions {
        rates,
        tick_scale: args.tick_scale,
        cet_time: daemon_config.cet_time.unwrap_or(4.0),
        transfer_relay: daemon_config.transfer_relay.unwrap_or(true),
        init_demand: args.init_demand,
        presence_simulation: args.presence_simulation,
        simulation_seed: args.simulation_seed,
        ..ControllerOptions::default()
    };

    let bus_port = args
        .bus_port
        .clone()
        .or_else(|| daemon_config.bus_port.clone());
    let bus = match bus_port {
        Some(port) => match SerialLink::open(&port) {
            Ok(link) => Some(FieldBus::new(Box::new(link))),
            Err(e) => {
                error!(error = %e, "field bus unavailable");
                return ExitCode::BuildFail;
            }
        },
        None => {
            info!("field bus disabled");
            None
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "cannot start runtime");
            return ExitCode::BuildFail;
        }
    };

    let local = LocalSet::new();
    runtime.block_on(local.run_until(async move {
        let controller = match Controller::build(create(), options, bus) {
            Ok(controller) => controller,
            Err(e) => {
                error!(error = %e, "controller construction failed");
                return ExitCode::BuildFail;
            }
        };

        let listener =
            match tokio::net::TcpListener::bind(("0.0.0.0", args.rpc_port)).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!(port = args.rpc_port, error = %e, "RPC server failed to bind");
                    return ExitCode::RpcBindFail;
                }
            };
        info!(port = args.rpc_port, "RPC server listening");
        tokio::task::spawn_local(rpc::serve(listener, controller.clone()));

        let terminator = controller.clone();
        tokio::task::spawn_local(async move {
            let interrupt = tokio::signal::ctrl_c();
            #[cfg(unix)]
            {
                let mut terminate = match tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate(),
                ) {
                    Ok(terminate) => terminate,
                    Err(e) => {
                        error!(error = %e, "cannot install SIGTERM handler");
                        return;
                    }
                };
                tokio::select! {
                    _ = interrupt => info!("interrupt received"),
                    _ = terminate.recv() => info!("terminated"),
                }
            }
            #[cfg(not(unix))]
            if interrupt.await.is_ok() {
                info!("interrupt received");
            }
            terminator.shutdown();
        });

        match controller.run().await {
            Ok(()) => ExitCode::Ok,
            Err(fault) => {
                error!(fault = %fault, "exited degraded");
                ExitCode::Ok
            }
        }
    }))
}
