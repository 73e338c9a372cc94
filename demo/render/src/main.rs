use std::path::PathBuf;
use std::time::Instant;

use anzen::{
    grid::{manhattan_distance, Grid},
    path::{make_path, PathStep},
    safemap::SafeMap,
    scenario::{random_trajectories, Scenario, Trajectory},
    sipp::sipp,
    wsipp::wsipp,
    Time,
};
use image::{Rgba, RgbaImage};
use palette::{Hue, IntoColor, Lch, Srgb};
use rand::{prelude::StdRng, SeedableRng};
use rayon::iter::{ParallelBridge, ParallelIterator};
use structopt::StructOpt;
use ultraviolet::Vec2;

#[derive(Debug, StructOpt)]
#[structopt(name = "anzen-render")]
struct Args {
    /// MovingAI map file; an open grid is generated when absent
    #[structopt(long)]
    map: Option<PathBuf>,

    /// Scenario file holding `start_i start_j goal_i goal_j`; defaults to
    /// opposite corners
    #[structopt(long)]
    scen: Option<PathBuf>,

    #[structopt(long, default_value = "16")]
    height: i32,

    #[structopt(long, default_value = "16")]
    width: i32,

    #[structopt(long)]
    seed: Option<u64>,

    #[structopt(long, default_value = "12")]
    obstacles: usize,

    #[structopt(long, default_value = "20", help = "Laps each obstacle shuttles before settling")]
    cycles: usize,

    #[structopt(long, default_value = "1.0", help = "Heuristic inflation; 1.0 runs plain sipp")]
    weight: f64,

    #[structopt(long, default_value = "30", help = "Pixels per grid cell")]
    cell: u32,

    #[structopt(long, default_value = "6", help = "Interpolated frames per timestep")]
    substeps: u32,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::from_args();

    let grid = match &args.map {
        Some(path) => Grid::from_file(path).expect("failed to read map"),
        None => Grid::from_cells(vec![vec![false; args.width as usize]; args.height as usize]),
    };
    let (height, width) = grid.size();

    let scenario = match &args.scen {
        Some(path) => Scenario::from_file(path).expect("failed to read scenario"),
        None => Scenario { start: (0, 0), goal: (height - 1, width - 1) },
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    println!("seed: {}", seed);

    let random = &mut StdRng::seed_from_u64(seed);
    let trajectories = random_trajectories(random, args.obstacles, height, width, args.cycles);
    let map = SafeMap::new(&grid, &trajectories);

    println!("searching");
    let now = Instant::now();

    let result = if (args.weight - 1.0).abs() < f64::EPSILON {
        sipp(&map, scenario.start, scenario.goal, manhattan_distance)
    } else {
        wsipp(&map, scenario.start, scenario.goal, args.weight, manhattan_distance)
    };

    let elapsed = now.elapsed();

    #[rustfmt::skip]
    println!("search took {:?} - found: {}, steps: {}, nodes: {}", elapsed, result.found, result.steps, result.nodes_created);

    match make_path(&result) {
        Some((steps, length)) => {
            println!("path length: {}", length);
            render_path(&grid, &trajectories, &steps, args.cell, args.substeps);
        }
        None => println!("No path found!"),
    }
}

fn obstacle_at(traj: &Trajectory, t: Time) -> Vec2 {
    let (i, j) = traj[t.clamp(0, traj.len() as Time - 1) as usize];
    Vec2::new(j as f32, i as f32)
}

fn render_path(grid: &Grid, trajectories: &[Trajectory], steps: &[PathStep], cell: u32, substeps: u32) {
    let (height, width) = grid.size();
    let (px_w, px_h) = (width as u32 * cell, height as u32 * cell);

    let _ = std::fs::create_dir("out");
    for entry in std::fs::read_dir("out").unwrap().flatten() {
        let _ = std::fs::remove_file(entry.path());
    }

    // Static background we clone for every frame
    let mut base_img = RgbaImage::from_pixel(px_w, px_h, Rgba([245, 245, 245, 255]));
    for i in 0..height {
        for j in 0..width {
            if !grid.traversable(i, j) {
                fill_cell_rect(&mut base_img, j as f32, i as f32, cell, 0.0, Rgba([70, 80, 80, 255]));
            }
        }
    }

    let frames = steps.len() as u32 * substeps;

    (0..frames).par_bridge().for_each(|frame| {
        let mut image = base_img.clone();

        let s = (frame / substeps) as usize;
        let frac = (frame % substeps) as f32 / substeps as f32;
        let t = steps[s].g;

        // Obstacles, one hue per id
        for (id, traj) in trajectories.iter().enumerate() {
            let beg = obstacle_at(traj, t);
            let end = obstacle_at(traj, t + 1);
            let pos = beg + (end - beg) * frac;

            let col: Lch = Srgb::new(60u8, 60, 220).into_format::<f32>().into_linear().into_color();
            let col = col.shift_hue(id as f32 * 47.0);
            let rgb: palette::rgb::Rgb = col.into_color();

            let (r, g, b) = rgb.into_format::<u8>().into_components();
            fill_cell_rect(&mut image, pos.x, pos.y, cell, 0.2, Rgba([r, g, b, 255]));
        }

        // Agent
        let curr = steps[s];
        let next = steps[(s + 1).min(steps.len() - 1)];
        let beg = Vec2::new(curr.j as f32, curr.i as f32);
        let end = Vec2::new(next.j as f32, next.i as f32);
        fill_cell_disc(&mut image, beg + (end - beg) * frac, cell, Rgba([230, 90, 40, 255]));

        image.save(format!("out/step_{:04}.png", frame)).unwrap();
    });

    println!("wrote {} frames to out/", frames);
}

fn fill_cell_rect(image: &mut RgbaImage, x: f32, y: f32, cell: u32, margin: f32, color: Rgba<u8>) {
    let k = cell as f32;
    let (x0, y0) = (((x + margin) * k) as i64, ((y + margin) * k) as i64);
    let (x1, y1) = (((x + 1.0 - margin) * k) as i64, ((y + 1.0 - margin) * k) as i64);

    for py in y0.max(0)..y1.min(image.height() as i64) {
        for px in x0.max(0)..x1.min(image.width() as i64) {
            image.put_pixel(px as u32, py as u32, color);
        }
    }
}

fn fill_cell_disc(image: &mut RgbaImage, pos: Vec2, cell: u32, color: Rgba<u8>) {
    let k = cell as f32;
    let centre = (pos + Vec2::new(0.5, 0.5)) * k;
    let radius = 0.3 * k;

    let (x0, y0) = ((centre.x - radius) as i64, (centre.y - radius) as i64);
    let (x1, y1) = ((centre.x + radius) as i64 + 1, (centre.y + radius) as i64 + 1);

    for py in y0.max(0)..y1.min(image.height() as i64) {
        for px in x0.max(0)..x1.min(image.width() as i64) {
            let d = Vec2::new(px as f32 + 0.5, py as f32 + 0.5) - centre;
            if d.mag_sq() <= radius * radius {
                image.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}
