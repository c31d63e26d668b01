use std::{fs, path::PathBuf, rc::Rc};

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

use amble_engine::{EightDirWalker, FourDirWalker, Point, Room, Scene, WalkSample, WalkVariant};
use amble_formats::{BoxDef, BoxFlags, BoxScale, NextHopMatrix, ScaleSlot};

/// Walks a single actor across a room and reports what happened.
#[derive(Parser, Debug)]
#[command(
    about = "Drives the walk machine across a room and logs the journey",
    version
)]
struct Args {
    /// Room description JSON; omit to use the built-in three-box corridor
    #[arg(long)]
    room_json: Option<PathBuf>,

    /// Start position as X,Y
    #[arg(long, default_value = "100,100")]
    start: String,

    /// Destination as X,Y
    #[arg(long, default_value = "500,100")]
    dest: String,

    /// Direction to face on arrival, in compass degrees
    #[arg(long)]
    facing: Option<i32>,

    /// Use the four-direction walker instead of the eight-direction one
    #[arg(long)]
    four_way: bool,

    /// Give up after this many ticks
    #[arg(long, default_value_t = 600)]
    ticks: usize,

    /// Path to write the per-tick walk log JSON
    #[arg(long)]
    walk_log_json: Option<PathBuf>,

    /// Print the full event log
    #[arg(long)]
    verbose: bool,
}

/// On-disk room description consumed by `--room-json`.
#[derive(Debug, Deserialize)]
struct RoomFile {
    boxes: Vec<RoomBox>,
    #[serde(default)]
    scale_slots: Vec<ScaleSlot>,
    #[serde(default)]
    next_hops: Vec<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
struct RoomBox {
    corners: [[i16; 2]; 4],
    #[serde(default)]
    mask: u8,
    #[serde(default)]
    flags: u8,
    scale: Option<BoxScale>,
}

#[derive(Serialize)]
struct WalkLog<'a> {
    samples: &'a [WalkSample],
    events: &'a [String],
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let start = parse_point(&args.start).context("parsing --start")?;
    let dest = parse_point(&args.dest).context("parsing --dest")?;

    let room = match args.room_json.as_ref() {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading room description {}", path.display()))?;
            let file: RoomFile = serde_json::from_str(&raw)
                .with_context(|| format!("parsing room description {}", path.display()))?;
            build_room(file)?
        }
        None => builtin_corridor()?,
    };

    let variant: Rc<dyn WalkVariant> = if args.four_way {
        Rc::new(FourDirWalker)
    } else {
        Rc::new(EightDirWalker)
    };

    let mut scene = Scene::new(room);
    let walker = scene.spawn_actor("walker", variant);
    scene.select_player(walker);
    scene.put_actor(walker, start);
    scene.start_walk(walker, dest, args.facing);

    println!("Room: {} walkboxes", scene.room().box_count());
    println!(
        "Walking from {},{} to {},{}",
        start.x, start.y, dest.x, dest.y
    );

    let mut samples = Vec::with_capacity(args.ticks + 1);
    if let Some(sample) = scene.sample(walker) {
        samples.push(sample);
    }
    for _ in 0..args.ticks {
        scene.advance_all();
        if let Some(sample) = scene.sample(walker) {
            samples.push(sample);
        }
        if !scene.any_moving() {
            break;
        }
    }
    if scene.any_moving() {
        eprintln!(
            "[walk_demo] walk still in flight after {} ticks",
            args.ticks
        );
    }

    let actor = scene
        .actor(walker)
        .context("walker vanished from the scene")?;
    println!("\nFinished after {} ticks", scene.tick());
    println!("  position: {},{}", actor.pos().x, actor.pos().y);
    println!("  facing:   {} degrees", actor.facing());
    match actor.current_box() {
        Some(id) => println!("  box:      {id}"),
        None => println!("  box:      none"),
    }
    println!("  events:   {}", scene.events().len());

    if args.verbose {
        println!("\nEvent log:");
        for (index, event) in scene.events().iter().enumerate() {
            println!("  {:>3}. {event}", index + 1);
        }
    }

    if let Some(path) = args.walk_log_json.as_ref() {
        let log = WalkLog {
            samples: &samples,
            events: scene.events(),
        };
        let json = serde_json::to_string_pretty(&log).context("serializing walk log to JSON")?;
        fs::write(path, json)
            .with_context(|| format!("writing walk log to {}", path.display()))?;
        println!("Saved walk log to {}", path.display());
    }

    Ok(())
}

fn parse_point(raw: &str) -> Result<Point> {
    let (x, y) = raw
        .split_once(',')
        .with_context(|| format!("point '{raw}' is not in X,Y form"))?;
    let x = x
        .trim()
        .parse()
        .with_context(|| format!("bad x coordinate in '{raw}'"))?;
    let y = y
        .trim()
        .parse()
        .with_context(|| format!("bad y coordinate in '{raw}'"))?;
    Ok(Point::new(x, y))
}

fn build_room(file: RoomFile) -> Result<Room> {
    let mut boxes = Vec::with_capacity(file.boxes.len());
    for entry in &file.boxes {
        let mut def = BoxDef::new(entry.corners);
        def.mask = entry.mask;
        def.flags = BoxFlags(entry.flags);
        if let Some(scale) = entry.scale {
            def.scale = scale;
        }
        boxes.push(def);
    }
    let mut room = Room::new(boxes, file.scale_slots)?;
    if !file.next_hops.is_empty() {
        let hops = NextHopMatrix::from_rows(&file.next_hops)
            .context("building next-hop matrix from room description")?;
        room.rebuild_matrix(&hops)?;
    }
    Ok(room)
}

/// Three boxes in a row with a full routing table; enough to exercise hop
/// refinement without any input file.
fn builtin_corridor() -> Result<Room> {
    let boxes = vec![
        BoxDef::new([[50, 50], [250, 50], [250, 150], [50, 150]]),
        BoxDef::new([[250, 50], [350, 50], [350, 150], [250, 150]]),
        BoxDef::new([[350, 50], [550, 50], [550, 150], [350, 150]]),
    ];
    let mut room = Room::new(boxes, Vec::new())?;
    let hops = NextHopMatrix::from_rows(&[vec![0, 1, 1], vec![0, 1, 2], vec![1, 1, 2]])?;
    room.rebuild_matrix(&hops)?;
    Ok(room)
}
